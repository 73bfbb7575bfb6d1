//! Hidden-content detection: white-on-white annotation text, sub-2-unit
//! bounding boxes holding text, off-page annotations, and hidden
//! optional-content layers.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::bytes::{find_sub, rfind_sub};
use crate::types::Annotation;

lazy_static! {
    static ref OCG_DICT: Regex = Regex::new(r"(?-u)/Type\s*/OCG\b").unwrap();
    static ref OC_PROPS: Regex = Regex::new(r"(?-u)/OCProperties\b").unwrap();
    static ref LAYER_NAME: Regex = Regex::new(r"(?-u)/Name\s*\(([^)]*)\)").unwrap();
    static ref OFF_LIST: Regex = Regex::new(r"(?-u)/OFF\s*\[([^\]]*)\]").unwrap();
    static ref OBJ_REF: Regex = Regex::new(r"(?-u)(\d+)\s+\d+\s+R\b").unwrap();
    static ref OBJ_HEADER: Regex = Regex::new(r"(?-u)(\d+)\s+\d+\s+obj\b").unwrap();
}

const LAYER_WINDOW: usize = 500;
const OC_PROPS_WINDOW: usize = 2000;

/// Bounding boxes narrower or shorter than this hold effectively
/// invisible content.
const TINY_BOUNDS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenKind {
    WhiteText,
    TinyBounds,
    OffPage,
    HiddenFlag,
    HiddenLayer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenItem {
    pub kind: HiddenKind,
    pub page: Option<usize>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    pub hidden: bool,
}

/// Scans annotations and raw bytes for concealed content
pub fn detect(
    bytes: &[u8],
    page_annotations: &[Vec<Annotation>],
    page_bounds: &[(f64, f64)],
) -> (Vec<HiddenItem>, Vec<LayerInfo>) {
    let mut items = Vec::new();

    for (page, annots) in page_annotations.iter().enumerate() {
        let bounds = page_bounds.get(page).copied().unwrap_or((612.0, 792.0));
        for annot in annots {
            if annot.is_white() && !annot.contents.trim().is_empty() {
                items.push(HiddenItem {
                    kind: HiddenKind::WhiteText,
                    page: Some(page),
                    description: format!(
                        "white-colored {} annotation holding text",
                        annot.subtype
                    ),
                });
            }
            if (annot.width() < TINY_BOUNDS || annot.height() < TINY_BOUNDS)
                && !annot.contents.trim().is_empty()
            {
                items.push(HiddenItem {
                    kind: HiddenKind::TinyBounds,
                    page: Some(page),
                    description: format!(
                        "{:.1}x{:.1} unit bounding box holding non-empty text",
                        annot.width(),
                        annot.height()
                    ),
                });
            }
            if is_off_page(annot, bounds) {
                items.push(HiddenItem {
                    kind: HiddenKind::OffPage,
                    page: Some(page),
                    description: format!(
                        "{} annotation placed outside the page bounds",
                        annot.subtype
                    ),
                });
            }
            if annot.hidden && !annot.contents.trim().is_empty() {
                items.push(HiddenItem {
                    kind: HiddenKind::HiddenFlag,
                    page: Some(page),
                    description: format!("{} annotation carries the hidden flag", annot.subtype),
                });
            }
        }
    }

    let layers = detect_layers(bytes);
    for layer in layers.iter().filter(|l| l.hidden) {
        items.push(HiddenItem {
            kind: HiddenKind::HiddenLayer,
            page: None,
            description: format!("optional-content layer '{}' is switched off", layer.name),
        });
    }

    (items, layers)
}

/// Optional-content groups from the raw bytes; a layer counts as hidden
/// when its object number is a member of the OCProperties /OFF list.
pub fn detect_layers(bytes: &[u8]) -> Vec<LayerInfo> {
    let off_members = off_member_objects(bytes);

    OCG_DICT
        .find_iter(bytes)
        .map(|m| {
            let window_start = m.start().saturating_sub(LAYER_WINDOW);
            let window_end = (m.end() + LAYER_WINDOW).min(bytes.len());
            // Clamp to the enclosing dictionary so a neighboring layer's
            // /Name cannot leak in
            let dict_start = rfind_sub(&bytes[window_start..m.start()], b"<<")
                .map(|p| window_start + p)
                .unwrap_or(window_start);
            let dict_end = find_sub(&bytes[m.end()..window_end], b">>")
                .map(|p| m.end() + p + 2)
                .unwrap_or(window_end);
            let name = LAYER_NAME
                .captures(&bytes[dict_start..dict_end])
                .map(|c| String::from_utf8_lossy(&c[1]).into_owned())
                .unwrap_or_else(|| "unnamed".to_string());
            let object = OBJ_HEADER
                .captures_iter(&bytes[window_start..dict_start])
                .last()
                .and_then(|c| String::from_utf8_lossy(&c[1]).parse::<u32>().ok());
            LayerInfo {
                name,
                hidden: object.map_or(false, |number| off_members.contains(&number)),
            }
        })
        .collect()
}

/// Object numbers referenced inside the OCProperties /OFF array
fn off_member_objects(bytes: &[u8]) -> BTreeSet<u32> {
    let mut members = BTreeSet::new();
    if let Some(m) = OC_PROPS.find(bytes) {
        let end = (m.end() + OC_PROPS_WINDOW).min(bytes.len());
        if let Some(caps) = OFF_LIST.captures(&bytes[m.start()..end]) {
            for reference in OBJ_REF.captures_iter(&caps[1]) {
                if let Ok(number) = String::from_utf8_lossy(&reference[1]).parse() {
                    members.insert(number);
                }
            }
        }
    }
    members
}

fn is_off_page(annot: &Annotation, (page_w, page_h): (f64, f64)) -> bool {
    annot.rect[2] < 0.0 || annot.rect[3] < 0.0 || annot.rect[0] > page_w || annot.rect[1] > page_h
}
