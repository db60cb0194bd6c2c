//! Turns LIST responses into an ordered folder list.

use std::collections::HashMap;

use mailboard_imap::{ListResponse, MailboxAttribute};

use crate::model::MailFolder;

/// Delimiter reported for flat namespaces (LIST with a NIL delimiter).
pub const FLAT_DELIMITER: char = '/';

struct Node {
    folder: MailFolder,
    children: Vec<usize>,
}

/// Orders LIST entries depth-first, parents before children, keeping
/// server order among siblings.
///
/// Ancestors the server did not list are synthesized as `\Noselect`
/// folders. Repeated entries update the folder already placed.
#[must_use]
pub fn flatten_folders(entries: Vec<ListResponse>) -> Vec<MailFolder> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let separator = entry.delimiter;
        let delimiter = separator.unwrap_or(FLAT_DELIMITER);
        let name = match separator {
            Some(d) => entry.name.trim_end_matches(d),
            None => entry.name.as_str(),
        };
        if name.is_empty() {
            continue;
        }

        let segments: Vec<&str> = match separator {
            Some(d) => name.split(d).collect(),
            None => vec![name],
        };

        let mut parent: Option<usize> = None;
        let mut path = String::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                path.push(delimiter);
            }
            path.push_str(segment);
            let is_leaf = i + 1 == segments.len();

            let index = if let Some(&existing) = by_path.get(&path) {
                if is_leaf {
                    apply_attributes(&mut nodes[existing].folder, &entry.attributes);
                }
                existing
            } else {
                let mut folder = MailFolder {
                    name: (*segment).to_string(),
                    path: path.clone(),
                    delimiter: delimiter.to_string(),
                    attributes: vec![MailboxAttribute::NoSelect.as_str().to_string()],
                    flags: Vec::new(),
                };
                if is_leaf {
                    apply_attributes(&mut folder, &entry.attributes);
                }

                let index = nodes.len();
                nodes.push(Node {
                    folder,
                    children: Vec::new(),
                });
                match parent {
                    Some(p) => nodes[p].children.push(index),
                    None => roots.push(index),
                }
                by_path.insert(path.clone(), index);
                index
            };
            parent = Some(index);
        }
    }

    let mut ordered = Vec::with_capacity(nodes.len());
    let mut stack: Vec<usize> = roots.into_iter().rev().collect();
    while let Some(index) = stack.pop() {
        stack.extend(nodes[index].children.iter().rev());
        ordered.push(index);
    }

    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    ordered
        .into_iter()
        .filter_map(|index| slots[index].take().map(|node| node.folder))
        .collect()
}

fn apply_attributes(folder: &mut MailFolder, attributes: &[MailboxAttribute]) {
    folder.attributes = attributes.iter().map(|a| a.as_str().to_string()).collect();
    folder.flags = attributes
        .iter()
        .filter(|a| a.is_special_use())
        .map(|a| a.as_str().to_string())
        .collect();
}
