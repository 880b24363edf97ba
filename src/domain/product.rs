use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog product.
///
/// `id` is assigned by the store and immutable. `stock` never goes negative;
/// the schema enforces this in addition to the commit protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i64,
    pub image: String,
}

/// Fields for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image: String,
}

impl NewProduct {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(OrderError::Validation("product name is required".into()));
        }
        if self.price < Decimal::ZERO {
            return Err(OrderError::Validation(
                "product price must not be negative".into(),
            ));
        }
        if self.stock < 0 {
            return Err(OrderError::Validation(
                "product stock must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Partial product update. Absent fields keep their current values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub image: Option<String>,
}

impl ProductPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err(OrderError::Validation("product name is required".into()));
        }
        if let Some(price) = self.price
            && price < Decimal::ZERO
        {
            return Err(OrderError::Validation(
                "product price must not be negative".into(),
            ));
        }
        if let Some(stock) = self.stock
            && stock < 0
        {
            return Err(OrderError::Validation(
                "product stock must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Merges this patch over an existing product.
    pub fn apply(self, mut product: Product) -> Product {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(image) = self.image {
            product.image = image;
        }
        product
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_product() -> NewProduct {
        NewProduct {
            name: "Screen kit".into(),
            description: String::new(),
            price: dec!(10.00),
            stock: 5,
            image: String::new(),
        }
    }

    #[test]
    fn test_new_product_validation() {
        assert!(new_product().validate().is_ok());

        let mut missing_name = new_product();
        missing_name.name = "  ".into();
        assert!(matches!(
            missing_name.validate(),
            Err(OrderError::Validation(_))
        ));

        let mut negative_price = new_product();
        negative_price.price = dec!(-1.00);
        assert!(matches!(
            negative_price.validate(),
            Err(OrderError::Validation(_))
        ));

        let mut negative_stock = new_product();
        negative_stock.stock = -1;
        assert!(matches!(
            negative_stock.validate(),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn test_patch_apply_keeps_absent_fields() {
        let product = Product {
            id: 1,
            name: "Screen kit".into(),
            description: "original".into(),
            price: dec!(10.00),
            stock: 5,
            image: "a.png".into(),
        };

        let patch = ProductPatch {
            price: Some(dec!(12.50)),
            ..Default::default()
        };
        let updated = patch.apply(product.clone());

        assert_eq!(updated.price, dec!(12.50));
        assert_eq!(updated.name, product.name);
        assert_eq!(updated.description, product.description);
        assert_eq!(updated.stock, product.stock);
        assert_eq!(updated.image, product.image);
    }

    #[test]
    fn test_patch_validation() {
        let patch = ProductPatch {
            stock: Some(-3),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(OrderError::Validation(_))));
    }
}
