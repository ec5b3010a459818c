use super::constraint::Violation;
use super::tree::FieldNode;
use super::value::{FieldPath, Record, Value};

pub(crate) fn validate_tree(
    nodes: &[FieldNode],
    record: &Record,
    root: &FieldPath,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    collect(nodes, record, root, &mut violations);
    violations
}

fn collect(nodes: &[FieldNode], record: &Record, parent: &FieldPath, out: &mut Vec<Violation>) {
    let absent = Value::Null;
    for node in nodes {
        let path = parent.child(node.name());
        let value = record.get_path(path.record_segments()).unwrap_or(&absent);
        for constraint in node.constraints() {
            out.extend(constraint.evaluate(&path, value));
        }
        collect(node.children(), record, &path, out);
    }
}
