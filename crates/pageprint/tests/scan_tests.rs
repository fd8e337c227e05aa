//! End-to-end scan behavior over snapshot documents.

use pageprint::{
    EngineConfig, LabelSource, NodeBuilder, Page, ReadyState, SelectorKind, SnapshotDocument,
};

fn page(root: NodeBuilder) -> Page {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Page::new(SnapshotDocument::build(root).as_document())
}

fn body(children: Vec<NodeBuilder>) -> NodeBuilder {
    NodeBuilder::new("html").children(vec![
        NodeBuilder::new("head"),
        NodeBuilder::new("body").children(children),
    ])
}

#[test]
fn id_elements_get_id_primary_selector() {
    let page = page(body(vec![
        NodeBuilder::new("input").id("user"),
        NodeBuilder::new("input").id("pass").attr("type", "password"),
    ]));
    let outcome = page.scan_page();
    let elements = outcome.elements().unwrap();
    assert_eq!(elements.len(), 2);
    for fp in elements {
        let primary = fp.primary_selector().unwrap();
        assert_eq!(primary.kind, SelectorKind::Id);
        assert_eq!(primary.value, format!("#{}", fp.dom_id));
        let resolved = pageprint::locator::resolve(page.document(), &primary.value).unwrap();
        assert_eq!(resolved.id().as_deref(), Some(fp.dom_id.as_str()));
    }
}

#[test]
fn wrapped_label_text_excludes_input_value() {
    let page = page(body(vec![NodeBuilder::new("label")
        .text("数量")
        .child(NodeBuilder::new("input").id("qty").value("12"))]));
    let outcome = page.scan_page();
    let fp = &outcome.elements().unwrap()[0];
    assert_eq!(fp.label.text, "数量");
    assert_eq!(fp.label.source, LabelSource::WrappingLabel);
    assert_eq!(fp.current_value, "12");
}

#[test]
fn table_header_labels_body_cell_input() {
    let page = page(body(vec![NodeBuilder::new("table").id("people").children(vec![
        NodeBuilder::new("thead").child(NodeBuilder::new("tr").children(vec![
            NodeBuilder::new("th").text("Name"),
            NodeBuilder::new("th").text("Age"),
        ])),
        NodeBuilder::new("tbody").child(NodeBuilder::new("tr").children(vec![
            NodeBuilder::new("td").child(NodeBuilder::new("input")),
            NodeBuilder::new("td").child(NodeBuilder::new("input")),
        ])),
    ])]));
    let outcome = page.scan_page();
    let elements = outcome.elements().unwrap();
    let age_input = &elements[1];
    let table = age_input.table_context.as_ref().unwrap();
    assert_eq!(table.header_text, "Age");
    assert_eq!(table.col_index, 1);
    assert_eq!(table.row_index, 1);
    assert_eq!(table.table_id, "people");
    assert_eq!(age_input.label.text, "Age");
    assert_eq!(age_input.label.source, LabelSource::TableHeader);
}

#[test]
fn table_and_dialog_context_are_independent() {
    let page = page(body(vec![
        NodeBuilder::new("div").class("el-dialog").children(vec![
            NodeBuilder::new("span").class("el-dialog__title").text("编辑"),
            NodeBuilder::new("table").child(NodeBuilder::new("tr").children(vec![
                NodeBuilder::new("td").text("行一"),
                NodeBuilder::new("td").child(NodeBuilder::new("input").id("both")),
            ])),
        ]),
        NodeBuilder::new("input").id("neither"),
    ]));
    let outcome = page.scan_page();
    let elements = outcome.elements().unwrap();

    let both = elements.iter().find(|f| f.dom_id == "both").unwrap();
    assert!(both.table_context.is_some());
    assert_eq!(both.dialog_context.as_deref(), Some("编辑"));

    let neither = elements.iter().find(|f| f.dom_id == "neither").unwrap();
    assert!(neither.table_context.is_none());
    assert!(neither.dialog_context.is_none());
}

#[test]
fn hidden_loader_does_not_block_scan() {
    let page = page(body(vec![
        NodeBuilder::new("div")
            .class("el-loading-mask")
            .rect(0.0, 0.0, 800.0, 600.0)
            .display("none"),
        NodeBuilder::new("input").id("x"),
    ]));
    let outcome = page.scan_page();
    assert!(!outcome.is_loading());
    assert_eq!(outcome.elements().unwrap().len(), 1);
}

#[test]
fn visible_loader_returns_loading_sentinel() {
    let page = page(body(vec![
        NodeBuilder::new("div")
            .class("ant-spin-spinning")
            .rect(0.0, 0.0, 40.0, 40.0),
        NodeBuilder::new("input").id("x"),
    ]));
    let outcome = page.scan_page();
    assert!(outcome.is_loading());
}

#[test]
fn incomplete_document_returns_loading_sentinel() {
    let snapshot = SnapshotDocument::build_with_ready_state(
        NodeBuilder::new("html").children(vec![
            NodeBuilder::new("head"),
            NodeBuilder::new("body").child(NodeBuilder::new("input").id("early")),
        ]),
        ReadyState::Loading,
    );
    let page = Page::new(snapshot.as_document());
    assert!(page.scan_page().is_loading());

    snapshot.set_ready_state(ReadyState::Complete);
    assert_eq!(page.scan_page().elements().unwrap().len(), 1);
}

#[test]
fn shadow_scan_respects_depth_bound() {
    let page = page(body(vec![
        NodeBuilder::new("input").id("light"),
        NodeBuilder::new("x-host").shadow(vec![
            NodeBuilder::new("input").id("d1"),
            NodeBuilder::new("x-inner").shadow(vec![
                NodeBuilder::new("input").id("d2"),
                NodeBuilder::new("x-deep").shadow(vec![NodeBuilder::new("input").id("d3")]),
            ]),
        ]),
    ]));
    let outcome = page.scan_page();
    let elements = outcome.elements().unwrap();
    let ids: Vec<&str> = elements.iter().map(|f| f.dom_id.as_str()).collect();

    assert!(ids.contains(&"light"));
    assert!(ids.contains(&"d1"));
    assert!(ids.contains(&"d2"));
    assert!(!ids.contains(&"d3"));

    let d2 = elements.iter().find(|f| f.dom_id == "d2").unwrap();
    assert_eq!(d2.shadow_depth, 2);
    assert_eq!(
        elements.iter().find(|f| f.dom_id == "d1").unwrap().shadow_depth,
        1
    );
}

#[test]
fn shadow_primary_selector_relocates_the_element() {
    let page = page(body(vec![
        NodeBuilder::new("input").id("light"),
        NodeBuilder::new("x-host").shadow(vec![NodeBuilder::new("input")
            .id("inner")
            .attr("placeholder", "shadow field")]),
    ]));
    let outcome = page.scan_page();
    let elements = outcome.elements().unwrap();
    let inner = elements.iter().find(|f| f.dom_id == "inner").unwrap();
    let primary = inner.primary_selector().unwrap();
    let resolved = pageprint::locator::resolve(page.document(), &primary.value).unwrap();
    assert_eq!(resolved.attr_or_empty("placeholder"), "shadow field");
}

#[test]
fn scan_is_deterministic_on_unchanged_dom() {
    let page = page(body(vec![
        NodeBuilder::new("div").class("el-form-item").children(vec![
            NodeBuilder::new("label").class("el-form-item__label").text("姓名："),
            NodeBuilder::new("input").class("el-input__inner"),
        ]),
        NodeBuilder::new("input").id("a").attr("placeholder", "备注"),
        NodeBuilder::new("table").child(NodeBuilder::new("tr").children(vec![
            NodeBuilder::new("td").text("列头"),
            NodeBuilder::new("td").child(NodeBuilder::new("input")),
        ])),
    ]));

    let first = page.scan_page();
    let second = page.scan_page();
    let first = first.elements().unwrap();
    let second = second.elements().unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.primary_selector(), b.primary_selector());
        assert_eq!(a.label.text, b.label.text);
    }
}

#[test]
fn autocomplete_options_carry_back_reference() {
    let page = page(body(vec![NodeBuilder::new("div")
        .class("el-autocomplete")
        .children(vec![
            NodeBuilder::new("input").id("city").class("el-input__inner"),
            NodeBuilder::new("div")
                .class("el-autocomplete-suggestion")
                .rect(0.0, 30.0, 200.0, 120.0)
                .child(NodeBuilder::new("ul").children(vec![
                    NodeBuilder::new("li").text("北京"),
                    NodeBuilder::new("li").text("上海"),
                    NodeBuilder::new("li"),
                ])),
        ])]));
    let outcome = page.scan_page();
    let elements = outcome.elements().unwrap();

    let options: Vec<_> = elements
        .iter()
        .filter(|f| f.is_autocomplete_option)
        .collect();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].current_value, "北京");
    assert_eq!(options[0].associated_input.as_deref(), Some("#city"));
}

#[test]
fn hidden_dropdown_options_are_not_harvested() {
    let page = page(body(vec![NodeBuilder::new("div")
        .class("el-select-dropdown")
        .display("none")
        .child(NodeBuilder::new("li").class("el-select-dropdown__item").text("甲"))]));
    let outcome = page.scan_page();
    assert!(outcome
        .elements()
        .unwrap()
        .iter()
        .all(|f| !f.is_autocomplete_option));
}

#[test]
fn iframe_content_is_scanned_with_frame_context() {
    let inner = SnapshotDocument::build(body(vec![NodeBuilder::new("input").id("in-frame")]));
    let page = page(body(vec![NodeBuilder::new("iframe")
        .id("f0")
        .rect(0.0, 0.0, 600.0, 300.0)
        .content_document(inner)]));
    let outcome = page.scan_page();
    let elements = outcome.elements().unwrap();
    let framed = elements.iter().find(|f| f.dom_id == "in-frame").unwrap();
    let frame = framed.frame_context.as_ref().unwrap();
    assert_eq!(frame.frame_depth, 1);
    assert_eq!(frame.frame_path, "iframe[0]");
}

#[test]
fn frames_beyond_depth_bound_are_not_entered() {
    fn frame_layer(child: NodeBuilder) -> SnapshotDocument {
        SnapshotDocument::build(body(vec![child]))
    }

    let level4 = frame_layer(NodeBuilder::new("input").id("level4"));
    let level3 = frame_layer(
        NodeBuilder::new("iframe")
            .rect(0.0, 0.0, 300.0, 300.0)
            .content_document(level4),
    );
    let level2 = frame_layer(
        NodeBuilder::new("iframe")
            .rect(0.0, 0.0, 300.0, 300.0)
            .content_document(level3),
    );
    let level1 = frame_layer(
        NodeBuilder::new("iframe")
            .rect(0.0, 0.0, 300.0, 300.0)
            .content_document(level2),
    );
    let page = page(body(vec![NodeBuilder::new("iframe")
        .rect(0.0, 0.0, 300.0, 300.0)
        .content_document(level1)]));

    let outcome = page.scan_page();
    assert!(outcome
        .elements()
        .unwrap()
        .iter()
        .all(|f| f.dom_id != "level4"));
}

#[test]
fn tiny_frames_are_skipped() {
    let inner = SnapshotDocument::build(body(vec![NodeBuilder::new("input").id("tracker")]));
    let page = page(body(vec![NodeBuilder::new("iframe")
        .rect(0.0, 0.0, 1.0, 1.0)
        .content_document(inner)]));
    let outcome = page.scan_page();
    assert!(outcome.elements().unwrap().is_empty());
}

#[test]
fn stability_score_reflects_anchors() {
    let page = page(body(vec![
        NodeBuilder::new("input").id("strong").attr("aria-label", "单价"),
        NodeBuilder::new("div").child(NodeBuilder::new("input")),
    ]));
    let outcome = page.scan_page();
    let elements = outcome.elements().unwrap();

    let strong = elements.iter().find(|f| f.dom_id == "strong").unwrap();
    // id selector (40) + aria label (35) + non-empty label text (15)
    assert_eq!(strong.stability_score, 90);

    let weak = elements.iter().find(|f| f.dom_id.is_empty()).unwrap();
    assert_eq!(weak.stability_score, 0);
}

#[test]
fn batch_serializes_in_boundary_shape() {
    let page = page(body(vec![NodeBuilder::new("input")
        .id("q")
        .attr("required", "")
        .attr("placeholder", "搜索")]));
    let outcome = page.scan_page();
    let json = serde_json::to_value(&outcome).unwrap();
    let element = &json.as_array().unwrap()[0];
    assert_eq!(element["selectors"][0]["kind"], "id");
    assert_eq!(element["selectors"][0]["value"], "#q");
    assert_eq!(element["placeholder"], "搜索");
    assert_eq!(element["state"]["required"], true);
    assert_eq!(element["label"]["source"], "placeholder-fallback");
    assert!(element.get("table_context").is_none());
}

#[test]
fn config_overrides_change_engine_behavior() {
    let mut config = EngineConfig::default();
    config.proximity.left_radius = 5.0;
    let doc = SnapshotDocument::build(body(vec![
        NodeBuilder::new("span").text_at("远处标题", 10.0, 50.0, 60.0, 16.0),
        NodeBuilder::new("input").id("far").rect(300.0, 50.0, 150.0, 20.0),
    ]));
    let page = Page::with_config(doc.as_document(), config);
    let outcome = page.scan_page();
    let fp = &outcome.elements().unwrap()[0];
    // The text sits 230px left of the input: inside the default radius,
    // outside the narrowed one.
    assert_eq!(fp.label.source, LabelSource::PlaceholderFallback);
}
