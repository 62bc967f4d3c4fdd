//! A statistical variable in the census taxonomy.

/// A node of the characteristic tree.
///
/// `description` is the fully qualified path from the root, each ancestor
/// fragment joined by [`crate::hierarchy::SEPARATOR`]. `parent_id` is `None`
/// for roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Characteristic {
  pub characteristic_id: i64,
  pub description:       String,
  pub note:              Option<String>,
  pub parent_id:         Option<i64>,
}
