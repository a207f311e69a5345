//! Pre-order flattening of a choice tree into identified, parent-linked nodes.

use pathweaver_core::id::IdGenerator;
use uuid::Uuid;

use crate::domain::tree::{ChoiceNode, FlatStoryNode};

/// Assigns a fresh identifier to every node of `root` and lists the nodes in
/// pre-order, so every parent precedes its children. The root is the only
/// node without a parent.
#[must_use]
pub fn flatten(root: &ChoiceNode, story_id: Uuid, ids: &mut dyn IdGenerator) -> Vec<FlatStoryNode> {
    let mut flat = Vec::with_capacity(root.node_count());
    let mut stack: Vec<(&ChoiceNode, Option<Uuid>)> = vec![(root, None)];

    while let Some((node, parent_id)) = stack.pop() {
        let id = ids.next_id();
        flat.push(FlatStoryNode {
            id,
            parent_id,
            story_id,
            title: node.title.clone(),
            choice_label: node.incoming_choice_label.clone(),
            choice_description: node.incoming_choice_description.clone(),
            narrative_text: node.narrative_text.clone(),
            image_prompt: node.image_prompt.clone(),
            is_terminal: node.is_terminal,
        });
        // Reversed so the first choice is visited first.
        stack.extend(node.children.iter().rev().map(|child| (child, Some(id))));
    }

    flat
}
