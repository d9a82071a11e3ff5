//! Product and variant types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, FieldErrors};
use crate::ids::{BrandId, CategoryId, ProductId, StoreFrontId, SupplierId, VariantId};
use crate::money::Money;

/// Product status in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Being prepared, not visible to customers.
    #[default]
    Draft,
    /// Visible on every storefront it is assigned to.
    Active,
    /// Temporarily hidden.
    Inactive,
    /// Retired, data preserved.
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(ProductStatus::Draft),
            "active" => Some(ProductStatus::Active),
            "inactive" => Some(ProductStatus::Inactive),
            "archived" => Some(ProductStatus::Archived),
            _ => None,
        }
    }

    /// Publication flag implied by this status.
    pub fn is_published(&self) -> bool {
        matches!(self, ProductStatus::Active)
    }

    /// Check that `self -> next` is an allowed edge.
    ///
    /// Activation additionally needs variant and inventory preconditions;
    /// those are checked by the activation gate against the store.
    pub fn check_transition(self, next: ProductStatus) -> Result<(), CommerceError> {
        use ProductStatus::*;
        let allowed = match next {
            Active => matches!(self, Draft | Inactive),
            Inactive => self == Active,
            Archived => matches!(self, Active | Inactive),
            Draft => self == Archived,
        };
        if allowed {
            return Ok(());
        }
        let message = match next {
            Active => format!("Cannot activate product from status {}", self.as_str()),
            Inactive => "Can only deactivate an active product".to_string(),
            Archived => "Can only archive active or inactive products".to_string(),
            Draft => "Can only re-open an archived product to draft".to_string(),
        };
        Err(CommerceError::IllegalTransition(message))
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name_en: String,
    pub name_ar: String,
    /// URL slug derived from `name_en`, unique within each assigned storefront.
    pub slug: String,
    pub description_en: String,
    pub description_ar: String,
    pub brand_id: Option<BrandId>,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub is_internal_supplier: bool,
    /// Discriminating attribute ("size", "color"); `None` for simple products.
    pub attribute_type: Option<String>,
    pub status: ProductStatus,
    /// Derived from `status`; never set directly.
    pub is_published: bool,
    pub is_featured: bool,
    pub is_new: bool,
    pub is_best_seller: bool,
    /// Base price, used by variants that carry no price of their own.
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether this is a simple (untyped) product.
    pub fn is_simple(&self) -> bool {
        self.attribute_type.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Move to `status`, keeping the publication flag in step.
    pub fn set_status(&mut self, status: ProductStatus, at: DateTime<Utc>) {
        self.status = status;
        self.is_published = status.is_published();
        self.updated_at = at;
    }

    /// Whether a storefront shopper may see this product.
    pub fn is_visible(&self) -> bool {
        !self.is_deleted() && self.is_published && self.status == ProductStatus::Active
    }
}

/// A sellable variant of a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    /// Unique among non-deleted variants.
    pub sku: String,
    /// Empty exactly when the parent product is simple.
    pub attribute_value: String,
    pub price: Option<Money>,
    pub compare_at_price: Option<Money>,
    pub cost_price: Option<Money>,
    pub barcode: Option<String>,
    pub weight: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Variant {
    /// Selling price: the variant's own, else the product's.
    pub fn unit_price(&self, product: &Product) -> Money {
        self.price.unwrap_or(product.price)
    }

    /// Cost snapshot for order lines.
    pub fn unit_cost(&self) -> Money {
        self.cost_price.unwrap_or_default()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Check the simple-vs-typed rule between a product and a variant value.
pub fn validate_attribute_rule(
    attribute_type: Option<&str>,
    attribute_value: &str,
) -> Result<(), CommerceError> {
    match attribute_type {
        None if !attribute_value.is_empty() => Err(CommerceError::invalid_field(
            "attribute_value",
            "simple product cannot have attribute values",
        )),
        Some(kind) if attribute_value.is_empty() => Err(CommerceError::invalid_field(
            "attribute_value",
            format!("variant must specify attribute_value for {} product", kind),
        )),
        _ => Ok(()),
    }
}

fn default_true() -> bool {
    true
}

/// Fields of a variant supplied by an admin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VariantInput {
    /// Existing variant to update when upserting through a product update.
    #[serde(default)]
    pub id: Option<VariantId>,
    pub sku: String,
    #[serde(default)]
    pub attribute_value: String,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub cost_price: Option<Money>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Initial stock for every assigned storefront. Ignored on update.
    #[serde(default)]
    pub stock: Option<i64>,
}

impl VariantInput {
    pub fn validate(&self) -> Result<(), CommerceError> {
        let mut errors = FieldErrors::new();
        errors.check(self.sku.trim().is_empty(), "sku", "is required");
        for (field, value) in [
            ("price", self.price),
            ("compare_at_price", self.compare_at_price),
            ("cost_price", self.cost_price),
        ] {
            errors.check(
                value.map(|m| m.is_negative()).unwrap_or(false),
                field,
                "must not be negative",
            );
        }
        errors.check(self.stock.map(|s| s < 0).unwrap_or(false), "stock", "must not be negative");
        errors.into_result()
    }

    /// Build a variant row for `product` (id assigned by the store).
    pub fn to_variant(&self, product_id: ProductId, at: DateTime<Utc>) -> Variant {
        Variant {
            id: VariantId::default(),
            product_id,
            sku: self.sku.trim().to_string(),
            attribute_value: self.attribute_value.trim().to_string(),
            price: self.price,
            compare_at_price: self.compare_at_price,
            cost_price: self.cost_price,
            barcode: self.barcode.clone().filter(|b| !b.is_empty()),
            weight: self.weight,
            length: self.length,
            width: self.width,
            height: self.height,
            is_active: self.is_active,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    /// Overwrite the editable fields of an existing variant.
    pub fn apply_to(&self, variant: &mut Variant, at: DateTime<Utc>) {
        variant.sku = self.sku.trim().to_string();
        variant.attribute_value = self.attribute_value.trim().to_string();
        variant.price = self.price;
        variant.compare_at_price = self.compare_at_price;
        variant.cost_price = self.cost_price;
        if let Some(barcode) = self.barcode.as_ref().filter(|b| !b.is_empty()) {
            variant.barcode = Some(barcode.clone());
        }
        variant.weight = self.weight;
        variant.length = self.length;
        variant.width = self.width;
        variant.height = self.height;
        variant.is_active = self.is_active;
        variant.updated_at = at;
    }
}

/// Fields of a product supplied by an admin, for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductInput {
    pub name_en: String,
    pub name_ar: String,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub description_ar: String,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub is_internal_supplier: bool,
    #[serde(default)]
    pub attribute_type: Option<String>,
    pub store_front_ids: Vec<StoreFrontId>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_best_seller: bool,
    #[serde(default)]
    pub price: Option<Money>,
    /// Variants to create with the product.
    #[serde(default)]
    pub variants: Vec<VariantInput>,
}

impl ProductInput {
    /// Normalised attribute type: blank strings mean "simple".
    pub fn attribute_type(&self) -> Option<String> {
        self.attribute_type
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }

    /// Check required fields and in-request SKU duplicates.
    pub fn validate(&self) -> Result<(), CommerceError> {
        let mut errors = FieldErrors::new();
        errors.check(self.name_en.trim().is_empty(), "name_en", "is required");
        errors.check(self.name_ar.trim().is_empty(), "name_ar", "is required");
        errors.check(
            self.store_front_ids.is_empty(),
            "store_front_ids",
            "must contain at least one storefront",
        );
        errors.check(
            self.price.map(|m| m.is_negative()).unwrap_or(false),
            "price",
            "must not be negative",
        );
        errors.into_result()?;

        let mut seen = std::collections::HashSet::new();
        for variant in &self.variants {
            variant.validate()?;
            if !seen.insert(variant.sku.trim()) {
                return Err(CommerceError::Duplicate(format!(
                    "Duplicate SKU '{}' in request",
                    variant.sku.trim()
                )));
            }
        }
        Ok(())
    }

    /// Distinct storefront ids, in request order.
    pub fn store_fronts(&self) -> Vec<StoreFrontId> {
        let mut out = Vec::with_capacity(self.store_front_ids.len());
        for id in &self.store_front_ids {
            if !out.contains(id) {
                out.push(*id);
            }
        }
        out
    }

    /// Build a draft product row (id assigned by the store).
    pub fn to_product(&self, slug: String, at: DateTime<Utc>) -> Product {
        Product {
            id: ProductId::default(),
            name_en: self.name_en.trim().to_string(),
            name_ar: self.name_ar.trim().to_string(),
            slug,
            description_en: self.description_en.clone(),
            description_ar: self.description_ar.clone(),
            brand_id: self.brand_id,
            category_id: self.category_id,
            supplier_id: self.supplier_id,
            is_internal_supplier: self.is_internal_supplier,
            attribute_type: self.attribute_type(),
            status: ProductStatus::Draft,
            is_published: false,
            is_featured: self.is_featured,
            is_new: self.is_new,
            is_best_seller: self.is_best_seller,
            price: self.price.unwrap_or_default(),
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    /// Overwrite the editable fields of an existing product. Status is untouched.
    pub fn apply_to(&self, product: &mut Product, slug: String, at: DateTime<Utc>) {
        product.name_en = self.name_en.trim().to_string();
        product.name_ar = self.name_ar.trim().to_string();
        product.slug = slug;
        product.description_en = self.description_en.clone();
        product.description_ar = self.description_ar.clone();
        product.brand_id = self.brand_id;
        product.category_id = self.category_id;
        product.supplier_id = self.supplier_id;
        product.is_internal_supplier = self.is_internal_supplier;
        product.attribute_type = self.attribute_type();
        product.is_featured = self.is_featured;
        product.is_new = self.is_new;
        product.is_best_seller = self.is_best_seller;
        if let Some(price) = self.price {
            product.price = price;
        }
        product.updated_at = at;
    }
}

/// Admin view of a product.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub store_front_ids: Vec<StoreFrontId>,
    pub variants: Vec<Variant>,
}
