//! XMP packet parser.
//!
//! Pulls dates and the `xmpMM:History` event list out of the embedded XMP
//! packet. Both serialization styles are handled: values as element text
//! and values as attributes on `rdf:Description` / `rdf:li`. The last
//! packet in the file wins, matching how incremental updates append a
//! fresh packet without removing the old one.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One `stEvt` entry from the edit history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmpEvent {
    pub action: String,
    pub when: Option<String>,
    pub software_agent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmpPacket {
    pub create_date: Option<String>,
    pub modify_date: Option<String>,
    pub metadata_date: Option<String>,
    pub history: Vec<XmpEvent>,
}

impl XmpPacket {
    /// History rendered as `action agent` / `action` strings
    pub fn history_strings(&self) -> Vec<String> {
        self.history
            .iter()
            .map(|event| match &event.software_agent {
                Some(agent) => format!("{} {}", event.action, agent),
                None => event.action.clone(),
            })
            .collect()
    }
}

/// Slice of the last XMP packet in the byte stream, if any.
fn last_packet(bytes: &[u8]) -> Option<&[u8]> {
    const OPEN: &[u8] = b"<x:xmpmeta";
    const CLOSE: &[u8] = b"</x:xmpmeta>";
    let start = rfind(bytes, OPEN)?;
    let end = rfind(&bytes[start..], CLOSE)? + start;
    Some(&bytes[start..end + CLOSE.len()])
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TextTarget {
    CreateDate,
    ModifyDate,
    MetadataDate,
    EventAction,
    EventWhen,
    EventAgent,
}

/// Parses the last XMP packet. `None` when the bytes carry no packet;
/// malformed XML yields whatever was read up to the error.
pub fn parse(bytes: &[u8]) -> Option<XmpPacket> {
    let packet = last_packet(bytes)?;
    let mut reader = Reader::from_reader(packet);
    reader.trim_text(true);

    let mut out = XmpPacket::default();
    let mut target: Option<TextTarget> = None;
    let mut in_history = false;
    let mut pending: Option<XmpEvent> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                if ends_with(&name, b":History") {
                    in_history = true;
                } else if in_history && ends_with(&name, b":li") {
                    let mut event = XmpEvent::default();
                    read_attributes(e, &mut out, Some(&mut event));
                    pending = Some(event);
                } else {
                    read_attributes(e, &mut out, pending.as_mut());
                    target = text_target(&name, pending.is_some());
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = e.name().as_ref().to_vec();
                if in_history && ends_with(&name, b":li") {
                    let mut event = XmpEvent::default();
                    read_attributes(e, &mut out, Some(&mut event));
                    if !event.action.is_empty() {
                        out.history.push(event);
                    }
                } else {
                    read_attributes(e, &mut out, pending.as_mut());
                }
            }
            Ok(Event::Text(ref t)) => {
                if let (Some(target), Ok(value)) = (target, t.unescape()) {
                    assign(target, value.into_owned(), &mut out, pending.as_mut());
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name().as_ref().to_vec();
                if ends_with(&name, b":History") {
                    in_history = false;
                } else if ends_with(&name, b":li") {
                    if let Some(event) = pending.take() {
                        if !event.action.is_empty() {
                            out.history.push(event);
                        }
                    }
                }
                target = None;
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }
    Some(out)
}

fn text_target(name: &[u8], in_event: bool) -> Option<TextTarget> {
    if in_event {
        if ends_with(name, b":action") {
            return Some(TextTarget::EventAction);
        }
        if ends_with(name, b":when") {
            return Some(TextTarget::EventWhen);
        }
        if ends_with(name, b":softwareAgent") {
            return Some(TextTarget::EventAgent);
        }
    }
    if ends_with(name, b":CreateDate") {
        Some(TextTarget::CreateDate)
    } else if ends_with(name, b":ModifyDate") {
        Some(TextTarget::ModifyDate)
    } else if ends_with(name, b":MetadataDate") {
        Some(TextTarget::MetadataDate)
    } else {
        None
    }
}

fn read_attributes(element: &BytesStart<'_>, out: &mut XmpPacket, event: Option<&mut XmpEvent>) {
    let mut event = event;
    for attr in element.attributes().flatten() {
        let key = attr.key.as_ref().to_vec();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => continue,
        };
        if let Some(target) = text_target(&key, true) {
            assign(target, value, out, event.as_deref_mut());
        }
    }
}

fn assign(target: TextTarget, value: String, out: &mut XmpPacket, event: Option<&mut XmpEvent>) {
    match target {
        TextTarget::CreateDate => out.create_date = Some(value),
        TextTarget::ModifyDate => out.modify_date = Some(value),
        TextTarget::MetadataDate => out.metadata_date = Some(value),
        TextTarget::EventAction => {
            if let Some(event) = event {
                event.action = value;
            }
        }
        TextTarget::EventWhen => {
            if let Some(event) = event {
                event.when = Some(value);
            }
        }
        TextTarget::EventAgent => {
            if let Some(event) = event {
                event.software_agent = Some(value);
            }
        }
    }
}

fn ends_with(name: &[u8], suffix: &[u8]) -> bool {
    name.len() >= suffix.len() && &name[name.len() - suffix.len()..] == suffix
}
