use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{FlowError, FlowResult};

/// Search results are capped so a broad query cannot haul the whole
/// catalog into the model's context.
pub const MAX_SEARCH_RESULTS: usize = 25;

/// A storefront product as stored in the catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub handle: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The projection of a product returned to the model. Tags and any other
/// internal fields stay out of the tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductHit {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub handle: String,
}

impl From<&Product> for ProductHit {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            handle: product.handle.clone(),
        }
    }
}

/// In-memory product snapshot, loaded once at startup. The live store is
/// an external collaborator; flows only ever see this read-only copy.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn from_json_str(content: &str) -> FlowResult<Self> {
        let products: Vec<Product> = serde_json::from_str(content)
            .map_err(|e| FlowError::Internal(format!("failed to parse catalog: {e}")))?;
        Ok(Self { products })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> FlowResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Internal(format!("failed to read catalog at `{}`: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// A small built-in catalog so the server runs without a snapshot file.
    pub fn demo() -> Self {
        let content = include_str!("catalog/demo.json");
        Self::from_json_str(content).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Case-insensitive substring search over title, description and tags.
    ///
    /// Ordering is deterministic: relevance score (a title hit outranks a
    /// description or tag hit) then title, independent of catalog order.
    pub fn search(&self, query: &str) -> Vec<ProductHit> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(u32, &Product)> = self
            .products
            .iter()
            .filter_map(|product| {
                let mut score = 0;
                if product.title.to_lowercase().contains(&needle) {
                    score += 2;
                }
                if product.description.to_lowercase().contains(&needle) {
                    score += 1;
                }
                if product
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle))
                {
                    score += 1;
                }
                (score > 0).then_some((score, product))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.title.cmp(&b.1.title)));
        scored
            .into_iter()
            .take(MAX_SEARCH_RESULTS)
            .map(|(_, product)| ProductHit::from(product))
            .collect()
    }
}
