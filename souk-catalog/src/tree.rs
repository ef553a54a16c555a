use souk_shared::models::{Category, CategoryNode};
use std::collections::HashMap;
use uuid::Uuid;

/// Converts a flat list of category rows into a nested forest.
///
/// Children keep the order of `categories`, so callers sort rows (by name)
/// beforehand. A row whose parent is absent from the input is promoted to a
/// root rather than dropped. Rows that only reach each other through a parent
/// cycle are broken at the first such row in input order, which becomes a
/// root. Repeated ids keep their first occurrence.
pub fn build_category_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let mut index: HashMap<Uuid, usize> = HashMap::with_capacity(categories.len());
    for (pos, category) in categories.iter().enumerate() {
        index.entry(category.id).or_insert(pos);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); categories.len()];
    let mut roots = Vec::new();

    for (pos, category) in categories.iter().enumerate() {
        if index[&category.id] != pos {
            continue;
        }
        match category.parent_id.and_then(|parent| index.get(&parent).copied()) {
            Some(parent) if parent != pos => children[parent].push(pos),
            _ => roots.push(pos),
        }
    }

    let mut placed = vec![false; categories.len()];
    let mut forest = Vec::with_capacity(roots.len());

    for root in roots {
        forest.push(assemble(root, categories, &children, &mut placed));
    }

    // Whatever is still unplaced sits on a parent cycle.
    for pos in 0..categories.len() {
        if !placed[pos] && index[&categories[pos].id] == pos {
            forest.push(assemble(pos, categories, &children, &mut placed));
        }
    }

    forest
}

fn assemble(
    pos: usize,
    categories: &[Category],
    children: &[Vec<usize>],
    placed: &mut [bool],
) -> CategoryNode {
    placed[pos] = true;
    let mut node = CategoryNode::leaf(categories[pos].clone());
    for &child in &children[pos] {
        if !placed[child] {
            node.children.push(assemble(child, categories, children, placed));
        }
    }
    node
}
