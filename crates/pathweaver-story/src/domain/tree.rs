//! The choice tree and its flattened, persistable form.

use pathweaver_core::repository::StoredStoryNode;
use serde::Serialize;
use uuid::Uuid;

/// Label of the implicit choice leading to the root situation.
pub const ROOT_CHOICE_LABEL: &str = "Start";

/// Fewest onward choices a non-terminal situation may offer.
pub const MIN_CHOICES: usize = 2;

/// Most onward choices a non-terminal situation may offer.
pub const MAX_CHOICES: usize = 3;

/// One situation of the branching narrative, with the choices leading on.
///
/// Invariants (upheld by the tree builder): `is_terminal` iff `children` is
/// empty, and a non-terminal node has `MIN_CHOICES..=MAX_CHOICES` children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceNode {
    /// Short situation title.
    pub title: String,
    /// What happens in this situation.
    pub narrative_text: String,
    /// Illustration prompt.
    pub image_prompt: String,
    /// Label of the choice that led here.
    pub incoming_choice_label: String,
    /// Description of the choice that led here.
    pub incoming_choice_description: String,
    /// Whether the story ends here.
    pub is_terminal: bool,
    /// Onward situations, one per choice.
    pub children: Vec<ChoiceNode>,
}

impl ChoiceNode {
    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Number of choices on the longest path from `self` to an ending.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// One step of the path from the root to a situation being generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// The situation the player was in.
    pub situation: String,
    /// Label of the choice the player made there.
    pub choice_label: String,
    /// Description of that choice.
    pub choice_description: String,
}

/// A tree node with its identity and parent linkage, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatStoryNode {
    /// Node identifier.
    pub id: Uuid,
    /// Parent node, `None` only for the root.
    pub parent_id: Option<Uuid>,
    /// Owning story.
    pub story_id: Uuid,
    /// Short situation title.
    pub title: String,
    /// Label of the choice leading here.
    pub choice_label: String,
    /// Description of the choice leading here.
    pub choice_description: String,
    /// Narrative text of the situation.
    pub narrative_text: String,
    /// Illustration prompt.
    pub image_prompt: String,
    /// Whether the story ends here.
    pub is_terminal: bool,
}

impl FlatStoryNode {
    /// Converts into the stored row at pre-order `position`.
    #[must_use]
    pub fn to_stored(&self, position: i32) -> StoredStoryNode {
        StoredStoryNode {
            id: self.id,
            story_id: self.story_id,
            parent_id: self.parent_id,
            position,
            title: self.title.clone(),
            choice_label: self.choice_label.clone(),
            choice_description: self.choice_description.clone(),
            narrative_text: self.narrative_text.clone(),
            image_prompt: self.image_prompt.clone(),
            is_terminal: self.is_terminal,
        }
    }
}
