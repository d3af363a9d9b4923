use crate::schema::{ChunkSchema, ColumnDescriptor};

/// Trait for schema introspection
///
/// Lookups are by exact column name; the ingestion service reports names
/// already normalized.
pub trait SchemaInspector {
    /// Get the number of columns
    fn column_count(&self) -> usize;

    /// Position of a column within each row
    fn column_index(&self, name: &str) -> Option<usize>;

    /// Get column by name
    fn get_column(&self, name: &str) -> Option<&ColumnDescriptor>;

    /// Check if schema contains a specific column
    fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Get all column names in row order
    fn column_names(&self) -> Vec<&str>;
}

impl SchemaInspector for ChunkSchema {
    fn column_count(&self) -> usize {
        self.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.name == name)
    }

    fn get_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns().iter().find(|c| c.name == name)
    }

    fn column_names(&self) -> Vec<&str> {
        self.columns().iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ChunkSchemaBuilder, ColumnType};

    #[test]
    fn test_schema_inspector() {
        let schema = ChunkSchemaBuilder::new()
            .with_column(ColumnDescriptor::new("ID", ColumnType::Fixed).with_nullable(false))
            .with_column(ColumnDescriptor::new("PAYLOAD", ColumnType::Variant))
            .build()
            .unwrap();

        assert_eq!(schema.column_count(), 2);
        assert!(schema.has_column("PAYLOAD"));
        assert!(!schema.has_column("payload"));
        assert_eq!(schema.column_index("PAYLOAD"), Some(1));
        assert_eq!(
            schema.get_column("ID").map(|c| c.column_type),
            Some(ColumnType::Fixed)
        );
        assert_eq!(schema.column_names(), vec!["ID", "PAYLOAD"]);
    }
}
