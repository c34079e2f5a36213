//! Outline preview handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use scribe_common::{
    errors::{AppError, Result},
    models::SectionTree,
};
use scribe_report::outline;

/// Request to build a structure preview
#[derive(Debug, Deserialize, Validate)]
pub struct OutlineRequest {
    /// Heading-marked text; an empty string yields the standard template
    #[validate(length(max = 50000))]
    #[serde(default)]
    pub text: String,
}

#[derive(Serialize)]
pub struct OutlineResponse {
    pub sections: Vec<OutlineNode>,
}

/// One node of the nested structure as returned to clients
#[derive(Serialize)]
pub struct OutlineNode {
    pub id: Uuid,
    pub title: String,
    pub level: usize,
    pub children: Vec<OutlineNode>,
}

/// Build a structure preview from heading-marked text
pub async fn build_outline(
    State(_state): State<AppState>,
    Json(request): Json<OutlineRequest>,
) -> Result<Json<OutlineResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let tree = if request.text.trim().is_empty() {
        outline::template_tree()
    } else {
        outline::tree_from_headings(&request.text)
    };

    Ok(Json(OutlineResponse {
        sections: tree_to_nodes(&tree),
    }))
}

/// Flatten the arena tree into the nested client shape
pub fn tree_to_nodes(tree: &SectionTree) -> Vec<OutlineNode> {
    tree.top_level()
        .into_iter()
        .filter_map(|id| node_to_nested(tree, id))
        .collect()
}

fn node_to_nested(tree: &SectionTree, id: Uuid) -> Option<OutlineNode> {
    let node = tree.get(id)?;
    Some(OutlineNode {
        id: node.id,
        title: node.title.clone(),
        level: node.level,
        children: node
            .children
            .iter()
            .filter_map(|child| node_to_nested(tree, *child))
            .collect(),
    })
}
