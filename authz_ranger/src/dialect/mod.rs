//! What differs between Ranger service types: which access types a catalog
//! privilege maps to, and how a metadata object becomes a resource path.

mod path;
mod privileges;

use std::fmt::Display;
use std::str::FromStr;

use anyhow::{bail, Error};

pub use path::PathTranslator;
pub use privileges::PrivilegeMapping;

/// The kind of Ranger service the plugin manages policies in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ServiceType {
    /// Hive, Spark SQL and other engines sharing the hadoop SQL service
    /// definition. Resources are database/table/column.
    #[default]
    HadoopSql,
    /// HDFS. A single `path` resource.
    Hdfs,
}

impl FromStr for ServiceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hadoopsql" | "hive" => Ok(ServiceType::HadoopSql),
            "hdfs" => Ok(ServiceType::Hdfs),
            other => bail!("unknown Ranger service type {other:?}; expected hadoopsql or hdfs"),
        }
    }
}

impl Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceType::HadoopSql => write!(f, "hadoopsql"),
            ServiceType::Hdfs => write!(f, "hdfs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_types_parse_case_insensitively() -> anyhow::Result<()> {
        assert_eq!("HadoopSQL".parse::<ServiceType>()?, ServiceType::HadoopSql);
        assert_eq!("hdfs".parse::<ServiceType>()?, ServiceType::Hdfs);
        assert!("kafka".parse::<ServiceType>().is_err());
        Ok(())
    }
}
