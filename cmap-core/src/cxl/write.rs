//! [`ConceptMap`] back into a loaded CXL tree.
//!
//! Elements are matched by id and updated in place. Stale entries are removed
//! and new ones appended, so anything the model does not cover (comments,
//! unknown attributes, unrelated elements) stays where it was.

use std::collections::{HashMap, HashSet};

use super::xml::XmlElement;
use super::Dialect;
use crate::style::format_font_style;
use crate::{Color, ConceptMap, Connection, Node, NodeKind, ResolvedStyle, Style};

/// Write the model into a `map` element of the given dialect.
pub(crate) fn write_map(map_el: &mut XmlElement, model: &ConceptMap, dialect: Dialect) {
    set_number(map_el, "width", Some(model.width));
    set_number(map_el, "height", Some(model.height));

    let concepts: Vec<&Node> = model
        .nodes()
        .filter(|n| n.kind == NodeKind::Concept)
        .collect();
    let linkers: Vec<&Node> = model.nodes().filter(|n| n.is_linker()).collect();
    let connections: Vec<&Connection> = model.connections().collect();

    sync_list(map_el, "concept-list", "concept", "id", &concepts, |el, node| {
        el.set_attr("label", node.label.as_str());
    });
    sync_list(
        map_el,
        "linking-phrase-list",
        "linking-phrase",
        "id",
        &linkers,
        |el, node| el.set_attr("label", node.label.as_str()),
    );
    sync_list(map_el, "connection-list", "connection", "id", &connections, |el, conn| {
        el.set_attr("from-id", conn.from.as_str());
        el.set_attr("to-id", conn.to.as_str());
    });

    match dialect {
        Dialect::Appearance => {
            sync_list(
                map_el,
                "concept-appearance-list",
                "concept-appearance",
                "id",
                &concepts,
                |el, node| write_appearance(el, node, &model.defaults().concept),
            );
            sync_list(
                map_el,
                "linking-phrase-appearance-list",
                "linking-phrase-appearance",
                "id",
                &linkers,
                |el, node| write_appearance(el, node, &model.defaults().linking_phrase),
            );
            sync_list(
                map_el,
                "connection-appearance-list",
                "connection-appearance",
                "id",
                &connections,
                |el, conn| {
                    el.set_attr("from-pos", conn.from_anchor.side().as_str());
                    el.set_attr("to-pos", conn.to_anchor.side().as_str());
                    el.set_attr("from-index", conn.from_anchor.get().to_string());
                    el.set_attr("to-index", conn.to_anchor.get().to_string());
                },
            );
            write_style_sheet(map_el, model);
        }
        Dialect::Legacy => {
            let nodes: Vec<&Node> = model.nodes().collect();
            sync_list(map_el, "style-list", "style", "object-id", &nodes, |el, node| {
                write_legacy_style(el, node, model.default_style(node.kind));
            });
        }
    }
}

/// Something stored under a key attribute in a list element.
trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for &Node {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

impl Keyed for &Connection {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

/// Bring `parent/list/item` in line with `items`, matched on `key_attr`.
fn sync_list<T: Keyed>(
    parent: &mut XmlElement,
    list: &str,
    item: &str,
    key_attr: &str,
    items: &[T],
    mut apply: impl FnMut(&mut XmlElement, &T),
) {
    let index: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(i, it)| (it.key(), i))
        .collect();
    let list_el = parent.ensure_child(list);
    let mut seen = HashSet::new();
    list_el.retain_elements(|e| {
        if e.name != item {
            return true;
        }
        // Later elements repeating a key were never loaded.
        e.attr(key_attr)
            .is_some_and(|k| index.contains_key(k) && seen.insert(k.to_string()))
    });

    let mut written = HashSet::new();
    for el in list_el.elements_mut().filter(|e| e.name == item) {
        let Some(&i) = el.attr(key_attr).and_then(|k| index.get(k)) else {
            continue;
        };
        apply(el, &items[i]);
        written.insert(i);
    }
    for (i, it) in items.iter().enumerate() {
        if written.contains(&i) {
            continue;
        }
        let mut el = list_el.sibling_kind(item);
        el.set_attr(key_attr, it.key());
        apply(&mut el, it);
        list_el.append_element(el);
    }
}

fn write_appearance(el: &mut XmlElement, node: &Node, defaults: &ResolvedStyle) {
    set_number(el, "x", Some(node.bounds.x));
    set_number(el, "y", Some(node.bounds.y));
    set_number(el, "width", Some(node.bounds.width));
    set_number(el, "height", Some(node.bounds.height));
    write_style_overrides(el, &node.style, defaults);
}

/// Pinned attributes are written, unpinned ones removed.
fn write_style_overrides(el: &mut XmlElement, style: &Style, defaults: &ResolvedStyle) {
    el.set_or_remove_attr("font-name", style.font_family.clone());
    set_number(el, "font-size", style.font_size);
    set_color(el, "font-color", style.font_color);
    set_color(el, "background-color", style.fill_color);
    set_color(el, "border-color", style.border_color);
    set_number(el, "border-thickness", style.border_width);
    let font_style = style.has_font_style().then(|| {
        let resolved = style.resolve(defaults);
        format_font_style(resolved.bold, resolved.italic, resolved.underline)
    });
    el.set_or_remove_attr("font-style", font_style);
}

fn write_style_sheet(map_el: &mut XmlElement, model: &ConceptMap) {
    let sheet_list = map_el.ensure_child("style-sheet-list");
    let sheet = sheet_list.ensure_child("style-sheet");
    if sheet.attr("id").is_none() {
        sheet.set_attr("id", "_Default_");
    }
    write_resolved(sheet.ensure_child("concept-style"), &model.defaults().concept);
    write_resolved(
        sheet.ensure_child("linking-phrase-style"),
        &model.defaults().linking_phrase,
    );
}

fn write_resolved(el: &mut XmlElement, style: &ResolvedStyle) {
    el.set_attr("font-name", style.font_family.as_str());
    set_number(el, "font-size", Some(style.font_size));
    el.set_attr("font-style", style.font_style());
    set_color(el, "font-color", Some(style.font_color));
    set_color(el, "background-color", Some(style.fill_color));
    set_color(el, "border-color", Some(style.border_color));
    set_number(el, "border-thickness", Some(style.border_width));
}

/// Legacy readers have no style sheet, so effective values are written.
fn write_legacy_style(el: &mut XmlElement, node: &Node, defaults: &ResolvedStyle) {
    let style = node.style.resolve(defaults);

    let geom = el.ensure_child("geom");
    set_number(geom, "x", Some(node.bounds.x));
    set_number(geom, "y", Some(node.bounds.y));
    set_number(geom, "width", Some(node.bounds.width));
    set_number(geom, "height", Some(node.bounds.height));

    let text = el.ensure_child("text");
    text.set_attr("font-name", style.font_family.as_str());
    set_number(text, "font-size", Some(style.font_size));
    set_color(text, "color", Some(style.font_color));
    text.set_attr("style", style.font_style());

    let shape = el.ensure_child("shape");
    set_color(shape, "fill", Some(style.fill_color));
    set_color(shape, "border", Some(style.border_color));
}

/// Set a colour, keeping the existing text when it already denotes it.
fn set_color(el: &mut XmlElement, name: &str, color: Option<Color>) {
    let Some(color) = color else {
        el.remove_attr(name);
        return;
    };
    if el.attr(name).and_then(Color::try_parse) == Some(color) {
        return;
    }
    el.set_attr(name, color.to_rgba());
}

/// Set a number, keeping the existing text when it already denotes it.
fn set_number(el: &mut XmlElement, name: &str, value: Option<f64>) {
    let Some(value) = value else {
        el.remove_attr(name);
        return;
    };
    let same = el
        .attr(name)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .is_some_and(|current| (current - value).abs() < f64::EPSILON);
    if !same {
        el.set_attr(name, value.to_string());
    }
}
