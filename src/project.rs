//! Project data: the persisted form of an editor's data sources and
//! component tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::DataSourceDef;
use crate::dom::ComponentDef;
use crate::editor::Editor;
use crate::error::Result;
use crate::event::{EventKind, Topic};
use crate::logging::targets;

/// Saved editor state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<DataSourceDef>,
    /// Children of the wrapper.
    #[serde(default)]
    pub components: Vec<ComponentDef>,
}

impl ProjectData {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Editor {
    /// Current state, ready to be saved.
    ///
    /// Data sources are included when
    /// [`store_data_sources`](crate::EditorConfig::store_data_sources) is
    /// set, except those flagged to skip storage.
    pub fn project_data(&self) -> ProjectData {
        let data_sources = if self.config().store_data_sources {
            self.data
                .all()
                .iter()
                .filter(|source| !source.skips_storage())
                .map(|source| source.to_def())
                .collect()
        } else {
            Vec::new()
        };
        let components = self
            .tree
            .children(self.wrapper)
            .iter()
            .filter_map(|&child| self.serialize(child, true))
            .collect();
        ProjectData {
            data_sources,
            components,
        }
    }

    /// Replace the component tree with the one in `project`.
    ///
    /// Stored data sources are added first (replacing the records of
    /// existing ids), so bindings resolve against them. Symbol references
    /// are linked once every component exists.
    pub fn load_project(&mut self, project: ProjectData) -> Result<()> {
        for child in self.tree.children(self.wrapper).to_vec() {
            self.teardown(child);
            self.tree.remove(child);
        }
        for source in project.data_sources {
            self.add_data_source(source);
        }
        let wrapper = self.wrapper;
        let mut ids = Vec::with_capacity(project.components.len());
        for def in project.components {
            ids.push(self.build(def, wrapper, None, None)?);
        }
        self.resolve_symbol_refs();
        for &id in &ids {
            for node in self.tree.descendants(id) {
                self.update_symbol_override(node);
            }
        }
        tracing::debug!(target: targets::DATA, components = ids.len(), "project loaded");
        self.emit(Topic::component(wrapper, EventKind::Reset));
        Ok(())
    }

    /// [`load_project`](Self::load_project) from JSON.
    pub fn load_project_json(&mut self, value: Value) -> Result<()> {
        let project = ProjectData::from_value(value)?;
        self.load_project(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataRecord;
    use crate::EditorConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn storage_flags() {
        let mut ed = Editor::new();
        ed.add_data_source(DataSourceDef::new("kept").with_record(DataRecord::new("r")));
        ed.add_data_source(DataSourceDef::new("skipped").skip_from_storage(true));
        let ids: Vec<String> = ed.project_data().data_sources.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["kept".to_owned()]);

        let mut ed = Editor::with_config(EditorConfig::new().with_store_data_sources(false));
        ed.add_data_source(DataSourceDef::new("kept"));
        let data = ed.project_data();
        assert!(data.data_sources.is_empty());
        assert_eq!(data.to_value(), json!({ "components": [] }));
    }

    #[test]
    fn load_resolves_against_stored_sources() {
        let value = json!({
            "dataSources": [{ "id": "ds", "records": [{ "id": "r", "title": "Hi" }] }],
            "components": [{
                "type": "text",
                "title": { "type": "data-variable", "path": "ds.r.title" }
            }]
        });
        let mut ed = Editor::new();
        ed.load_project_json(value.clone()).unwrap();
        let text = ed.children(ed.wrapper())[0];
        assert_eq!(ed.component(text).unwrap().prop("title"), Some(&json!("Hi")));
        assert_eq!(ed.project_data().to_value(), value);
    }

    #[test]
    fn load_links_symbols() {
        let mut ed = Editor::new();
        let main = ed.add_component(ComponentDef::new("card")).unwrap();
        ed.clone_symbol(main).unwrap();
        let saved = ed.project_data();

        let mut loaded = Editor::new();
        loaded.load_project(saved.clone()).unwrap();
        let children = loaded.children(loaded.wrapper()).to_vec();
        assert_eq!(loaded.symbol_instances(children[0]), vec![children[1]]);
        assert_eq!(loaded.project_data(), saved);
    }
}
