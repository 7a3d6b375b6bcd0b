use crate::host::{HostEnvironment, NodeHandle};

/// Serialize a host node, tag included, for use as a fallback template.
///
/// Hosts without an `outerHTML` primitive get the node deep-cloned into a detached
/// container whose inner markup is read instead. The live node is never mutated.
pub fn extract_outer_markup(host: &dyn HostEnvironment, node: &NodeHandle) -> String {
    if let Some(markup) = host.outer_html(node) {
        return markup;
    }

    let container = host.create_element("div");
    host.append_clone(&container, node);
    host.inner_html(&container).unwrap_or_default()
}
