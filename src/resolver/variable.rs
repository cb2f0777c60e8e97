//! DataVariable: a live path into the data sources.

use serde_json::Value;

use super::props::DataVariableProps;
use crate::data::DataSources;

#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    props: DataVariableProps,
}

impl DataVariable {
    pub fn new(props: DataVariableProps) -> Self {
        Self { props }
    }

    pub fn path(&self) -> &str {
        &self.props.path
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.props.default_value.as_ref()
    }

    pub fn get_data_value(&self, store: &DataSources) -> Value {
        self.props.resolve(store)
    }

    pub fn props(&self) -> &DataVariableProps {
        &self.props
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.props.path = path;
    }

    pub(crate) fn set_default_value(&mut self, value: Option<Value>) {
        self.props.default_value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataRecord, DataSource, DataSourceDef};
    use serde_json::json;

    #[test]
    fn resolves_and_falls_back() {
        let mut store = DataSources::new();
        store.add(DataSource::from_def(
            DataSourceDef::new("ds").with_record(DataRecord::new("r").with_field("f", "v")),
        ));

        let mut var = DataVariable::new(DataVariableProps::new("ds.r.f").with_default("d"));
        assert_eq!(var.get_data_value(&store), json!("v"));

        var.set_path("ds.r.missing".into());
        assert_eq!(var.path(), "ds.r.missing");
        assert_eq!(var.get_data_value(&store), json!("d"));

        var.set_default_value(None);
        assert_eq!(var.get_data_value(&store), Value::Null);
    }
}
