//! Document rendering collaborator. Only callable once selections are
//! complete; the service layer enforces that gate.

use crate::model::quote::Quote;
use crate::pricing::material;
use crate::pricing::labor;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Unknown document kind: {0}")]
    UnknownKind(String),

    #[error("Render error: {0}")]
    RenderError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    WorkOrder,
    MaterialList,
    StoreOrder,
}

impl std::str::FromStr for DocumentKind {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work-order" => Ok(DocumentKind::WorkOrder),
            "material-list" => Ok(DocumentKind::MaterialList),
            "store-order" => Ok(DocumentKind::StoreOrder),
            other => Err(DocumentError::UnknownKind(other.to_string())),
        }
    }
}

pub trait DocumentRenderer: Send + Sync {
    fn render(&self, quote: &Quote, kind: DocumentKind) -> Result<String, DocumentError>;
}

/// Plain-text renderer; a PDF renderer would sit behind the same trait.
pub struct TextDocumentRenderer;

impl DocumentRenderer for TextDocumentRenderer {
    fn render(&self, quote: &Quote, kind: DocumentKind) -> Result<String, DocumentError> {
        let number = quote.quote_number.as_deref().unwrap_or("(unnumbered)");
        let mut out = String::new();
        match kind {
            DocumentKind::WorkOrder => {
                out.push_str(&format!("WORK ORDER — quote {}\n\n", number));
                for area in &quote.areas {
                    out.push_str(&format!("Area: {}\n", area.name));
                    if let Some(sel) = &area.selection {
                        out.push_str(&format!(
                            "  Color: {} | Sheen: {}\n",
                            sel.color.as_deref().unwrap_or("custom"),
                            sel.sheen.as_deref().unwrap_or("-")
                        ));
                    }
                    for item in area.items.iter().filter(|i| i.selected) {
                        out.push_str(&format!(
                            "  {} — {} x{} coats\n",
                            item.category,
                            labor::resolve_quantity(item),
                            item.coats
                        ));
                    }
                }
            }
            DocumentKind::MaterialList | DocumentKind::StoreOrder => {
                let title = if kind == DocumentKind::MaterialList { "MATERIAL LIST" } else { "STORE ORDER" };
                out.push_str(&format!("{} — quote {}\n\n", title, number));
                for area in &quote.areas {
                    for item in area.items.iter().filter(|i| i.selected) {
                        let gallons = item.gallons_override.unwrap_or_else(|| {
                            material::estimate_gallons(
                                labor::resolve_quantity(item),
                                item.coats,
                                quote.pricing_scheme.coverage_sqft_per_gallon,
                                quote.pricing_scheme.waste_factor,
                                item.application,
                            )
                        });
                        if gallons > 0.0 {
                            let sel = area.selection.as_ref();
                            out.push_str(&format!(
                                "{} — {} — {:.2} gal — {}\n",
                                area.name,
                                item.category,
                                gallons,
                                sel.and_then(|s| s.color.as_deref()).unwrap_or("color TBD"),
                            ));
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}
