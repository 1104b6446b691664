//! Metadata objects: the hierarchical, dotted-name entities of the catalog
//! (metalake, catalog, schema, table, column, ...).

use std::fmt::Display;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::AuthorizationError;

/// Separator between the levels of a metadata object's full name.
pub const NAME_SEPARATOR: char = '.';

/// The kind of entity a metadata object names.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataObjectType {
    /// The root container. Its name has a single level.
    Metalake,
    /// `catalog`
    Catalog,
    /// `catalog.schema`
    Schema,
    /// `catalog.schema.table`
    Table,
    /// `catalog.schema.table.column`
    Column,
    /// `catalog.schema.fileset`
    Fileset,
    /// `catalog.schema.topic`
    Topic,
}

impl MetadataObjectType {
    /// The number of dotted levels a full name of this type has.
    pub fn levels(&self) -> usize {
        match self {
            MetadataObjectType::Metalake | MetadataObjectType::Catalog => 1,
            MetadataObjectType::Schema => 2,
            MetadataObjectType::Table | MetadataObjectType::Fileset | MetadataObjectType::Topic => 3,
            MetadataObjectType::Column => 4,
        }
    }

    /// Whether this is a root scope (metalake or catalog) that privileges
    /// apply to as a whole.
    pub fn is_root(&self) -> bool {
        matches!(
            self,
            MetadataObjectType::Metalake | MetadataObjectType::Catalog
        )
    }
}

impl Display for MetadataObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetadataObjectType::Metalake => "METALAKE",
            MetadataObjectType::Catalog => "CATALOG",
            MetadataObjectType::Schema => "SCHEMA",
            MetadataObjectType::Table => "TABLE",
            MetadataObjectType::Column => "COLUMN",
            MetadataObjectType::Fileset => "FILESET",
            MetadataObjectType::Topic => "TOPIC",
        };
        write!(f, "{name}")
    }
}

/// A metadata object, identified by its full name and type.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetadataObject {
    full_name: String,
    #[serde(rename = "type")]
    object_type: MetadataObjectType,
}

impl MetadataObject {
    /// Create a metadata object, validating that the name has the right
    /// number of non-empty levels for its type.
    pub fn new<S: Into<String>>(full_name: S, object_type: MetadataObjectType) -> Result<Self> {
        let full_name = full_name.into();
        let names: Vec<_> = full_name.split(NAME_SEPARATOR).collect();
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(AuthorizationError::InvalidMetadataObject(format!(
                "{full_name:?} contains an empty name"
            ))
            .into());
        }
        if names.len() != object_type.levels() {
            return Err(AuthorizationError::InvalidMetadataObject(format!(
                "{full_name:?} has {} levels, but a {object_type} name has {}",
                names.len(),
                object_type.levels()
            ))
            .into());
        }
        Ok(Self {
            full_name,
            object_type,
        })
    }

    /// The dotted full name, e.g. `catalog.db1.tab1`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The type of the object.
    pub fn object_type(&self) -> MetadataObjectType {
        self.object_type
    }

    /// Every level of the full name, outermost first.
    pub fn names(&self) -> Vec<&str> {
        self.full_name.split(NAME_SEPARATOR).collect()
    }

    /// The last level of the full name.
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit(NAME_SEPARATOR)
            .next()
            .unwrap_or(&self.full_name)
    }

    /// The full name of the enclosing object, if any.
    pub fn parent(&self) -> Option<&str> {
        self.full_name
            .rsplit_once(NAME_SEPARATOR)
            .map(|(parent, _)| parent)
    }
}

impl Display for MetadataObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.full_name, self.object_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_split_into_levels() -> Result<()> {
        let obj = MetadataObject::new("catalog.db1.tab1", MetadataObjectType::Table)?;
        assert_eq!(obj.names(), vec!["catalog", "db1", "tab1"]);
        assert_eq!(obj.name(), "tab1");
        assert_eq!(obj.parent(), Some("catalog.db1"));
        Ok(())
    }

    #[test]
    fn catalog_has_no_parent() -> Result<()> {
        let obj = MetadataObject::new("catalog", MetadataObjectType::Catalog)?;
        assert_eq!(obj.parent(), None);
        assert!(obj.object_type().is_root());
        Ok(())
    }

    #[test]
    fn wrong_level_count_is_rejected() {
        let err = MetadataObject::new("catalog.db1", MetadataObjectType::Table).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthorizationError>(),
            Some(AuthorizationError::InvalidMetadataObject(_))
        ));
    }

    #[test]
    fn empty_levels_are_rejected() {
        assert!(MetadataObject::new("catalog..tab1", MetadataObjectType::Table).is_err());
        assert!(MetadataObject::new("", MetadataObjectType::Catalog).is_err());
    }

    #[test]
    fn display_includes_the_type() -> Result<()> {
        let obj = MetadataObject::new("catalog.db1.tab1.col1", MetadataObjectType::Column)?;
        assert_eq!(obj.to_string(), "catalog.db1.tab1.col1 (COLUMN)");
        Ok(())
    }
}
