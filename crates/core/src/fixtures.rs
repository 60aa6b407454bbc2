//! Demonstration catalog shared by the CLI, the server and tests.

use crate::domain::category::Category;

pub fn demo_categories() -> Vec<Category> {
    vec![
        Category::with_products("Bebidas", ["Suco de Uva", "Refrigerante", "Água Mineral"], 4.0),
        Category::with_products("Eletrônicos", ["Celular", "Notebook", "Fone JBL"], 3.0)
            .with_subcategory(Category::with_products(
                "Acessórios",
                ["Cabo HDMI", "Mouse Gamer"],
                2.0,
            )),
        Category::with_products("Bananinha", ["Banana Chips", "Banana Passa"], 5.0)
            .with_subcategory(Category::with_products(
                "Bananas Gourmet",
                ["Banana Flambada", "Banana com Chocolate"],
                2.0,
            )),
    ]
}
