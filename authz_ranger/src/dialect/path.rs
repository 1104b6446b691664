use anyhow::Result;
use authz_core::metadata::{MetadataObject, MetadataObjectType};
use authz_core::AuthorizationError;
use indexmap::IndexMap;

use super::ServiceType;

/// Matches every value at a resource level.
pub const RESOURCE_ALL: &str = "*";

const HADOOP_SQL_LEVELS: &[&str] = &["database", "table", "column"];
const HDFS_LEVELS: &[&str] = &["path"];

/// Turns metadata objects into Ranger resource paths.
#[derive(Debug, Clone)]
pub struct PathTranslator {
    service_type: ServiceType,
    /// Directory that schemas live under, for HDFS.
    root: String,
}

impl PathTranslator {
    pub fn new<S: Into<String>>(service_type: ServiceType, root: S) -> Self {
        Self {
            service_type,
            root: root.into(),
        }
    }

    /// Replace the HDFS root directory.
    pub fn with_root<S: Into<String>>(mut self, root: S) -> Self {
        self.root = root.into();
        self
    }

    /// The resource levels the service declares, outermost first.
    pub fn resource_levels(&self) -> &'static [&'static str] {
        match self.service_type {
            ServiceType::HadoopSql => HADOOP_SQL_LEVELS,
            ServiceType::Hdfs => HDFS_LEVELS,
        }
    }

    /// The resource values for an object, one per level it addresses.
    ///
    /// Metalakes and catalogs cover everything, so they get a wildcard at
    /// every declared level.
    pub fn to_resource_levels(&self, object: &MetadataObject) -> Result<Vec<String>> {
        let declared = self.resource_levels();
        if object.object_type().is_root() {
            return Ok(vec![RESOURCE_ALL.to_owned(); declared.len()]);
        }
        let unsupported = |reason: String| -> anyhow::Error {
            AuthorizationError::UnsupportedObject {
                object: object.full_name().to_owned(),
                reason,
            }
            .into()
        };
        match self.service_type {
            ServiceType::HadoopSql => {
                if !matches!(
                    object.object_type(),
                    MetadataObjectType::Schema
                        | MetadataObjectType::Table
                        | MetadataObjectType::Column
                ) {
                    return Err(unsupported(format!(
                        "a {} has no {} resource",
                        object.object_type(),
                        self.service_type
                    )));
                }
                // The catalog level has no counterpart in Ranger. A column,
                // the deepest object, fills every declared level.
                Ok(object.names()[1..].iter().map(|n| n.to_string()).collect())
            }
            ServiceType::Hdfs => match object.object_type() {
                MetadataObjectType::Schema | MetadataObjectType::Fileset => {
                    let mut path = self.root.trim_end_matches('/').to_owned();
                    for name in &object.names()[1..] {
                        path.push('/');
                        path.push_str(name);
                    }
                    Ok(vec![path])
                }
                other => Err(unsupported(format!(
                    "a {other} has no {} path",
                    self.service_type
                ))),
            },
        }
    }

    /// Level names zipped with the object's resource values.
    pub fn resources(&self, object: &MetadataObject) -> Result<IndexMap<String, String>> {
        Ok(self
            .resource_levels()
            .iter()
            .zip(self.to_resource_levels(object)?)
            .map(|(level, value)| (level.to_string(), value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str, t: MetadataObjectType) -> MetadataObject {
        MetadataObject::new(name, t).unwrap()
    }

    #[test]
    fn tables_drop_the_catalog_level() -> Result<()> {
        let paths = PathTranslator::new(ServiceType::HadoopSql, "/");
        let table = object("catalog.db1.tab1", MetadataObjectType::Table);
        assert_eq!(paths.to_resource_levels(&table)?, vec!["db1", "tab1"]);
        let resources = paths.resources(&table)?;
        assert_eq!(
            resources.into_iter().collect::<Vec<_>>(),
            vec![
                ("database".to_owned(), "db1".to_owned()),
                ("table".to_owned(), "tab1".to_owned())
            ]
        );
        Ok(())
    }

    #[test]
    fn root_scopes_collapse_to_wildcards() -> Result<()> {
        let paths = PathTranslator::new(ServiceType::HadoopSql, "/");
        assert_eq!(
            paths.to_resource_levels(&object("catalog", MetadataObjectType::Catalog))?,
            vec!["*", "*", "*"]
        );
        let hdfs = PathTranslator::new(ServiceType::Hdfs, "/warehouse");
        assert_eq!(
            hdfs.to_resource_levels(&object("lake", MetadataObjectType::Metalake))?,
            vec!["*"]
        );
        Ok(())
    }

    #[test]
    fn columns_use_every_level() -> Result<()> {
        let paths = PathTranslator::new(ServiceType::HadoopSql, "/");
        let column = object("catalog.db1.tab1.col1", MetadataObjectType::Column);
        assert_eq!(paths.to_resource_levels(&column)?, vec!["db1", "tab1", "col1"]);
        assert_eq!(
            paths.resources(&column)?.keys().map(String::as_str).collect::<Vec<_>>(),
            paths.resource_levels().to_vec()
        );
        Ok(())
    }

    #[test]
    fn filesets_are_not_sql_resources() {
        let paths = PathTranslator::new(ServiceType::HadoopSql, "/");
        let err = paths
            .to_resource_levels(&object("catalog.db1.fs1", MetadataObjectType::Fileset))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthorizationError>(),
            Some(AuthorizationError::UnsupportedObject { .. })
        ));
    }

    #[test]
    fn hdfs_paths_hang_off_the_root() -> Result<()> {
        let hdfs = PathTranslator::new(ServiceType::Hdfs, "/warehouse/");
        assert_eq!(
            hdfs.to_resource_levels(&object("catalog.db1", MetadataObjectType::Schema))?,
            vec!["/warehouse/db1"]
        );
        assert_eq!(
            hdfs.to_resource_levels(&object("catalog.db1.fs1", MetadataObjectType::Fileset))?,
            vec!["/warehouse/db1/fs1"]
        );
        let root = PathTranslator::new(ServiceType::Hdfs, "/");
        assert_eq!(
            root.to_resource_levels(&object("catalog.db1", MetadataObjectType::Schema))?,
            vec!["/db1"]
        );
        assert!(root
            .to_resource_levels(&object("catalog.db1.tab1", MetadataObjectType::Table))
            .is_err());
        Ok(())
    }
}
