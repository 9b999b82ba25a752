// src/schema/catalog.rs
//
// The star schema the warehouse holds. Source column names are the
// destination names lowercased (`CustomerID` → `customerid`); the snake-case
// spelling is accepted as an alias.

use crate::schema::types::{Column, ColumnType, ForeignKey, Index, TableKind, TableSchema};

use ColumnType::{Date, Integer, Real, Text};

/// The two dimensions and the fact table, in load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarSchema {
    pub customers: TableSchema,
    pub products: TableSchema,
    pub sales: TableSchema,
}

impl StarSchema {
    pub fn table(&self, kind: TableKind) -> &TableSchema {
        match kind {
            TableKind::Customers => &self.customers,
            TableKind::Products => &self.products,
            TableKind::Sales => &self.sales,
        }
    }

    /// Dimensions first, fact last.
    pub fn tables(&self) -> [&TableSchema; 3] {
        [&self.customers, &self.products, &self.sales]
    }
}

impl Default for StarSchema {
    fn default() -> Self {
        Self {
            customers: dim_customer(),
            products: dim_product(),
            sales: fact_sales(),
        }
    }
}

pub fn dim_customer() -> TableSchema {
    TableSchema {
        name: "dim_customer".into(),
        kind: TableKind::Customers,
        columns: vec![
            Column::new("CustomerID", Integer).alias("customer_id"),
            Column::new("Name", Text).alias("customer_name"),
            Column::new("Region", Text),
            Column::new("JoinDate", Date).alias("join_date"),
            Column::new("LoyaltyPoints_Num", Integer).alias("loyalty_points_num"),
            Column::new("PreferredContactMethod_Cat", Text).alias("preferred_contact_method_cat"),
        ],
        primary_key: "CustomerID".into(),
        foreign_keys: vec![],
        indexes: vec![],
        required_date: None,
    }
}

pub fn dim_product() -> TableSchema {
    TableSchema {
        name: "dim_product".into(),
        kind: TableKind::Products,
        columns: vec![
            Column::new("ProductID", Integer).alias("product_id"),
            Column::new("ProductName", Text).alias("product_name"),
            Column::new("Category", Text),
            Column::new("UnitPrice", Real).alias("unit_price"),
            Column::new("CurrentDiscount_Pct", Real).alias("current_discount_pct"),
            Column::new("Supplier_Cat", Text).alias("supplier_cat"),
        ],
        primary_key: "ProductID".into(),
        foreign_keys: vec![],
        indexes: vec![],
        required_date: None,
    }
}

pub fn fact_sales() -> TableSchema {
    TableSchema {
        name: "fact_sales".into(),
        kind: TableKind::Sales,
        columns: vec![
            Column::new("TransactionID", Integer).alias("transaction_id"),
            Column::new("SaleDate", Date).alias("sale_date"),
            Column::new("CustomerID", Integer).alias("customer_id"),
            Column::new("ProductID", Integer).alias("product_id"),
            Column::new("StoreID", Integer).alias("store_id"),
            Column::new("CampaignID", Integer).alias("campaign_id"),
            Column::new("SaleAmount", Real).alias("sale_amount"),
            Column::new("BonusPoints_Num", Integer).alias("bonus_points_num"),
            Column::new("PaymentType_Cat", Text).alias("payment_type_cat"),
        ],
        primary_key: "TransactionID".into(),
        foreign_keys: vec![
            ForeignKey {
                column: "CustomerID".into(),
                references: "dim_customer".into(),
                referenced_column: "CustomerID".into(),
            },
            ForeignKey {
                column: "ProductID".into(),
                references: "dim_product".into(),
                referenced_column: "ProductID".into(),
            },
        ],
        indexes: vec![
            Index {
                name: "idx_fact_sales_customer".into(),
                column: "CustomerID".into(),
            },
            Index {
                name: "idx_fact_sales_product".into(),
                column: "ProductID".into(),
            },
            Index {
                name: "idx_fact_sales_store".into(),
                column: "StoreID".into(),
            },
        ],
        required_date: Some("SaleDate".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_names_follow_destination_names() {
        let sales = fact_sales();
        let pk = sales.primary_key_column().unwrap();
        assert_eq!(pk.source, "transactionid");
        assert_eq!(pk.aliases, vec!["transaction_id"]);
        assert_eq!(
            sales.column("BonusPoints_Num").unwrap().source,
            "bonuspoints_num"
        );
    }

    #[test]
    fn rules_pick_up_the_header_spelling() {
        let header: Vec<String> = ["Customer ID", "Name", "Join Date"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rules = dim_customer().scrub_rules(&header, true);
        assert_eq!(rules.natural_key, vec!["customer_id"]);
        assert!(rules.numeric_columns.contains("customerid"));
        assert!(rules.numeric_columns.contains("customer_id"));
        assert!(rules.date_columns.contains("join_date"));
        assert!(!rules.numeric_columns.contains("name"));
    }

    #[test]
    fn fact_ddl_carries_keys() {
        let sql = fact_sales().create_table_sql();
        assert!(sql.contains("TransactionID INTEGER PRIMARY KEY"));
        assert!(sql.contains("SaleDate TEXT"));
        assert!(sql.contains("FOREIGN KEY (CustomerID) REFERENCES dim_customer (CustomerID)"));
        assert!(sql.contains("FOREIGN KEY (ProductID) REFERENCES dim_product (ProductID)"));
        assert_eq!(fact_sales().create_index_sql().len(), 3);
    }

    #[test]
    fn insert_has_one_param_per_column() {
        let sql = dim_product().insert_sql();
        assert!(sql.starts_with("INSERT INTO dim_product (ProductID, ProductName"));
        assert!(sql.ends_with("VALUES (?1, ?2, ?3, ?4, ?5, ?6)"));
    }

    #[test]
    fn tables_come_dimensions_first() {
        let star = StarSchema::default();
        let kinds: Vec<TableKind> = star.tables().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TableKind::Customers, TableKind::Products, TableKind::Sales]
        );
    }
}
