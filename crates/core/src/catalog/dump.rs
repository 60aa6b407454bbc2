use std::fmt::Write;

use super::tree::{CatalogTree, Node};
use crate::domain::category::Category;

const INDENT: &str = "    ";

/// Multi-line rendering of the tree for inspection. Each node line carries
/// its cached height, balance factor and popularity, followed by the
/// category's products (heaviest first) and its nested subcategories.
pub fn render(tree: &CatalogTree) -> String {
    let mut out = String::from("=== Catalog tree (categories, subcategories, products) ===\n\n");
    match tree.root_node() {
        None => out.push_str("(empty)\n"),
        Some(root) => {
            render_node(&mut out, root, 0, "root");
            let _ = writeln!(out, "\nTotal: {} categories", tree.len());
        }
    }
    out
}

fn render_node(out: &mut String, node: &Node, level: usize, side: &str) {
    let category = &node.category;
    let _ = writeln!(
        out,
        "{}[{side:<5}] {} (h={}, bf={}, popularity={:.3})",
        INDENT.repeat(level),
        category.name(),
        node.height,
        node.balance_factor(),
        category.popularity(),
    );

    let body = INDENT.repeat(level + 1);
    render_products(out, category, &format!("{body}├─ "), &format!("{body}│   "));
    if !category.subcategories().is_empty() {
        let _ = writeln!(out, "{body}├─ Subcategories:");
        render_subcategories(out, category, &format!("{body}│   "));
    }

    if let Some(left) = node.left.as_deref() {
        render_node(out, left, level + 1, "left");
    }
    if let Some(right) = node.right.as_deref() {
        render_node(out, right, level + 1, "right");
    }
}

fn render_products(out: &mut String, category: &Category, heading: &str, item: &str) {
    let _ = writeln!(out, "{heading}Products:");
    if category.products().is_empty() {
        let _ = writeln!(out, "{item}(no products)");
        return;
    }
    for product in category.sorted_products_by_weight() {
        let _ = writeln!(out, "{item}• {} (weight={:.3})", product.name, product.weight);
    }
}

fn render_subcategories(out: &mut String, category: &Category, prefix: &str) {
    let count = category.subcategories().len();
    for (position, subcategory) in category.subcategories().iter().enumerate() {
        let connector = if position + 1 == count { "└─" } else { "├─" };
        let _ = writeln!(
            out,
            "{prefix}{connector} {} (popularity={:.3})",
            subcategory.name(),
            subcategory.popularity()
        );
        let nested = format!("{prefix}   ");
        for product in subcategory.sorted_products_by_weight() {
            let _ = writeln!(out, "{nested}• {} (weight={:.3})", product.name, product.weight);
        }
        if subcategory.products().is_empty() {
            let _ = writeln!(out, "{nested}(no products)");
        }
        render_subcategories(out, subcategory, &nested);
    }
}
