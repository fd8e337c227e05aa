use serde::{Deserialize, Serialize};

/// Distance thresholds for the visual-proximity label fallback, in CSS
/// pixels. These are heuristic tuning, not protocol, so they are carried as
/// configuration rather than literals at the use sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// How far to the left of the element a text node may sit.
    pub left_radius: f64,
    /// How far above the element a text node may sit.
    pub above_radius: f64,
    /// How far to the right of the element a text node may sit.
    pub right_radius: f64,
    /// Maximum center distance along the cross axis for side candidates.
    pub max_cross_gap: f64,
    /// Longest text-node content still considered a label candidate.
    pub max_text_len: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            left_radius: 250.0,
            above_radius: 60.0,
            right_radius: 200.0,
            max_cross_gap: 150.0,
            max_text_len: 50,
        }
    }
}

/// One loading-indicator convention: a diagnostic selector string plus the
/// structural conditions that identify matching elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderProbe {
    /// Reported verbatim as the `loader` diagnostic when the probe fires.
    pub selector: String,
    /// Class tokens that must all be present.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Substring that must appear in the class attribute (`[class*=..]`).
    #[serde(default)]
    pub fragment: Option<String>,
    /// Tags the probe never matches (`:not(input)` style exclusions).
    #[serde(default)]
    pub excluded_tags: Vec<String>,
}

impl LoaderProbe {
    fn classes(selector: &str, classes: &[&str]) -> Self {
        Self {
            selector: selector.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            fragment: None,
            excluded_tags: Vec::new(),
        }
    }

    fn fragment(selector: &str, fragment: &str, excluded_tags: &[&str]) -> Self {
        Self {
            selector: selector.to_string(),
            classes: Vec::new(),
            fragment: Some(fragment.to_string()),
            excluded_tags: excluded_tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// One modal/dialog container convention, tried in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogConvention {
    /// Class fragment identifying the container.
    pub container: String,
    /// Class fragment of the title element inside the container.
    pub title: String,
    /// Reported when the container has no title element.
    pub framework: String,
}

impl DialogConvention {
    fn new(container: &str, title: &str, framework: &str) -> Self {
        Self {
            container: container.to_string(),
            title: title.to_string(),
            framework: framework.to_string(),
        }
    }
}

/// Engine-wide heuristic tables and bounds.
///
/// The defaults reproduce the conventions observed across Ant Design,
/// Element UI, iView, Vant, WeUI, LayUI and Bootstrap; hosts facing other
/// component libraries extend the lists instead of patching the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub proximity: ProximityConfig,

    /// Containers treated as the same layout section for the proximity
    /// bonus.
    pub section_container_fragments: Vec<String>,

    /// Framework form-item container class fragments.
    pub form_item_fragments: Vec<String>,
    /// Label-child class fragments inside a form item.
    pub form_item_label_fragments: Vec<String>,

    /// Modal/dialog conventions, most specific first.
    pub dialog_conventions: Vec<DialogConvention>,

    /// Loading/skeleton conventions, checked in order.
    pub loader_probes: Vec<LoaderProbe>,

    /// Virtualized-grid row / cell class fragments for grid-position
    /// selectors.
    pub grid_row_fragments: Vec<String>,
    pub grid_cell_fragments: Vec<String>,

    /// Framework input-wrapper class fragments for the hover predicate.
    pub input_wrapper_fragments: Vec<String>,

    /// Floating autocomplete/dropdown panel and option conventions.
    pub autocomplete_panel_fragments: Vec<String>,
    pub autocomplete_option_fragments: Vec<String>,
    /// Combobox/autocomplete wrapper fragments used to find the associated
    /// input of a panel.
    pub autocomplete_wrapper_fragments: Vec<String>,

    /// Lifetime of the commit/flash highlight class, in milliseconds
    /// (three pulses of the injected keyframe animation).
    pub flash_duration_ms: u64,

    /// Shadow-root recursion bound.
    pub max_shadow_depth: usize,
    /// Iframe descent bound.
    pub max_frame_depth: usize,
    /// Frames smaller than this (either side, px) are skipped.
    pub min_frame_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proximity: ProximityConfig::default(),
            section_container_fragments: to_strings(&[
                "section", "card", "panel", "form", "fieldset", "group", "box",
            ]),
            form_item_fragments: to_strings(&[
                "el-form-item",
                "ant-form-item",
                "ivu-form-item",
                "van-field",
                "layui-form-item",
                "form-item",
                "form-group",
            ]),
            form_item_label_fragments: to_strings(&[
                "el-form-item__label",
                "ant-form-item-label",
                "ivu-form-item-label",
                "van-field__label",
                "layui-form-label",
                "control-label",
                "form-label",
            ]),
            dialog_conventions: vec![
                DialogConvention::new("el-dialog", "el-dialog__title", "el-dialog"),
                DialogConvention::new("ant-modal", "ant-modal-title", "ant-modal"),
                DialogConvention::new("ivu-modal", "ivu-modal-header", "ivu-modal"),
                DialogConvention::new("van-dialog", "van-dialog__header", "van-dialog"),
                DialogConvention::new("layui-layer", "layui-layer-title", "layui-layer"),
                DialogConvention::new("modal", "modal-title", "modal"),
            ],
            loader_probes: vec![
                LoaderProbe::classes(".ant-spin-spinning", &["ant-spin-spinning"]),
                LoaderProbe::classes(
                    ".ant-spin-container.ant-spin-blur",
                    &["ant-spin-container", "ant-spin-blur"],
                ),
                LoaderProbe::classes(".el-loading-mask", &["el-loading-mask"]),
                LoaderProbe::classes(".el-loading-spinner", &["el-loading-spinner"]),
                LoaderProbe::classes(".v-loading", &["v-loading"]),
                LoaderProbe::classes(".ivu-spin", &["ivu-spin"]),
                LoaderProbe::classes(".van-loading", &["van-loading"]),
                LoaderProbe::classes(".weui-loading", &["weui-loading"]),
                LoaderProbe::classes(".layui-layer-loading", &["layui-layer-loading"]),
                LoaderProbe::classes(".modal-loading", &["modal-loading"]),
                LoaderProbe::fragment(
                    "[class*=\"loading\"]:not(input):not(button)",
                    "loading",
                    &["input", "button"],
                ),
                LoaderProbe::fragment("[class*=\"spinner\"]:not(input)", "spinner", &["input"]),
                LoaderProbe::classes(".skeleton", &["skeleton"]),
                LoaderProbe::classes(".placeholder", &["placeholder"]),
            ],
            grid_row_fragments: to_strings(&[
                "el-table__row",
                "ant-table-row",
                "ivu-table-row",
                "grid-row",
                "table-row",
            ]),
            grid_cell_fragments: to_strings(&[
                "el-table__cell",
                "ant-table-cell",
                "ivu-table-cell",
                "grid-cell",
                "table-cell",
            ]),
            input_wrapper_fragments: to_strings(&[
                "el-input",
                "el-select",
                "el-textarea",
                "el-date-editor",
                "ant-input",
                "ant-select",
                "ant-picker",
                "ivu-input",
                "ivu-select",
                "van-field",
                "layui-input-block",
                "input-group",
            ]),
            autocomplete_panel_fragments: to_strings(&[
                "el-autocomplete-suggestion",
                "el-select-dropdown",
                "ant-select-dropdown",
                "ivu-select-dropdown",
                "van-dropdown-menu",
                "autocomplete-panel",
                "dropdown-menu",
            ]),
            autocomplete_option_fragments: to_strings(&[
                "el-select-dropdown__item",
                "ant-select-item-option",
                "ivu-select-item",
                "van-dropdown-item__option",
                "dropdown-item",
            ]),
            autocomplete_wrapper_fragments: to_strings(&[
                "el-autocomplete",
                "el-select",
                "ant-select",
                "ivu-select",
                "van-field",
                "autocomplete",
                "combobox",
            ]),
            flash_duration_ms: 900,
            max_shadow_depth: 2,
            max_frame_depth: 3,
            min_frame_size: 50.0,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
