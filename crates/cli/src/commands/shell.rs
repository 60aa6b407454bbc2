//! Interactive numbered menu over one in-memory catalog.
//!
//! The session is generic over its input and output so scripted sessions can
//! drive it in tests. End of input behaves like choosing `0`.

use std::io::{self, BufRead, Lines, Write};

use anyhow::Context;
use arbor_core::config::LoadOptions;
use arbor_core::Catalog;

use super::report::{render_human, ReportView};
use super::{load_catalog, CommandResult};

const MENU: &str = "\
=== Catalog menu ===
1. Insert category
2. Insert subcategory
3. Insert product
4. Show tree
5. Autocomplete (type letters, empty line to stop)
6. Remove category
7. Remove subcategory
8. Remove product
9. Performance report
0. Exit";

pub fn run(options: &LoadOptions) -> CommandResult {
    let (_, mut catalog) = match load_catalog("shell", options) {
        Ok(loaded) => loaded,
        Err(failure) => return failure,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match run_session(&mut catalog, stdin.lock(), &mut stdout).context("interactive shell I/O failed")
    {
        Ok(()) => CommandResult::success("shell", "session closed"),
        Err(error) => CommandResult::failure("shell", "io", format!("{error:#}"), 1),
    }
}

pub fn run_session<R: BufRead, W: Write>(
    catalog: &mut Catalog,
    input: R,
    output: &mut W,
) -> io::Result<()> {
    let mut session = Session { catalog, lines: input.lines(), out: output };
    session.show_tree()?;

    loop {
        writeln!(session.out, "\n{MENU}")?;
        let Some(choice) = session.ask("choose an option: ")? else {
            break;
        };
        match choice.as_str() {
            "1" => session.insert_category()?,
            "2" => session.insert_subcategory()?,
            "3" => session.insert_product()?,
            "4" => session.show_tree()?,
            "5" => session.autocomplete()?,
            "6" => session.remove_category()?,
            "7" => session.remove_subcategory()?,
            "8" => session.remove_product()?,
            "9" => {
                let report = render_human(&ReportView::of(&*session.catalog));
                writeln!(session.out, "{report}")?;
            }
            "0" => break,
            other => writeln!(session.out, "invalid option `{other}`")?,
        }
    }

    writeln!(session.out, "bye")
}

struct Session<'a, R, W> {
    catalog: &'a mut Catalog,
    lines: Lines<R>,
    out: &'a mut W,
}

impl<R: BufRead, W: Write> Session<'_, R, W> {
    /// Prompts and reads one trimmed line; `None` at end of input.
    fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        self.ask_raw(label).map(|line| line.map(|line| line.trim().to_string()))
    }

    fn ask_raw(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        match self.lines.next() {
            Some(line) => Ok(Some(line?.trim_end_matches(['\r', '\n']).to_string())),
            None => Ok(None),
        }
    }

    /// Reads a required name. Blank input or end of input cancels.
    fn ask_name(&mut self, label: &str) -> io::Result<Option<String>> {
        let answer = self.ask(label)?.filter(|name| !name.is_empty());
        if answer.is_none() {
            writeln!(self.out, "cancelled: a name is required")?;
        }
        Ok(answer)
    }

    /// Reads the name of an existing top-level category.
    fn ask_existing_category(&mut self) -> io::Result<Option<String>> {
        let Some(name) = self.ask_name("category: ")? else {
            return Ok(None);
        };
        if self.catalog.find_category(&name).is_none() {
            writeln!(self.out, "category `{name}` not found")?;
            return Ok(None);
        }
        Ok(Some(name))
    }

    fn show_tree(&mut self) -> io::Result<()> {
        write!(self.out, "{}", self.catalog.dump_tree())
    }

    fn insert_category(&mut self) -> io::Result<()> {
        let Some(name) = self.ask_name("new category name: ")? else {
            return Ok(());
        };
        if self.catalog.find_category(&name).is_some() {
            return writeln!(self.out, "category `{name}` already exists");
        }
        let category = self.catalog.new_category(name.as_str());
        self.catalog.insert_category(category);
        self.catalog.rebuild_index();
        writeln!(self.out, "category `{name}` inserted")
    }

    fn insert_subcategory(&mut self) -> io::Result<()> {
        let Some(category) = self.ask_existing_category()? else {
            return Ok(());
        };
        let Some(name) = self.ask_name("new subcategory name: ")? else {
            return Ok(());
        };
        let subcategory = self.catalog.new_category(name.as_str());
        self.catalog.add_subcategory(&category, subcategory);
        self.catalog.rebuild_index();
        writeln!(self.out, "subcategory `{name}` added to `{category}`")
    }

    fn insert_product(&mut self) -> io::Result<()> {
        let Some(category) = self.ask_existing_category()? else {
            return Ok(());
        };
        let Some(product) = self.ask_name("product name: ")? else {
            return Ok(());
        };
        let subcategory = self.ask("subcategory (blank for none): ")?.filter(|name| !name.is_empty());

        if !self.catalog.add_product(&category, subcategory.as_deref(), &product) {
            let missing = subcategory.unwrap_or_default();
            return writeln!(self.out, "subcategory `{missing}` not found in `{category}`");
        }
        self.catalog.rebuild_index();
        writeln!(self.out, "product `{product}` added")?;
        self.show_tree()
    }

    /// Builds the prefix one line at a time and shows suggestions after each
    /// step. An empty line ends the loop.
    fn autocomplete(&mut self) -> io::Result<()> {
        let mut prefix = String::new();
        loop {
            let Some(typed) = self.ask_raw(&format!("prefix `{prefix}` + "))? else {
                return Ok(());
            };
            if typed.is_empty() {
                return Ok(());
            }
            prefix.push_str(&typed);

            let suggestions = self.catalog.suggest_default(&prefix);
            writeln!(self.out, "suggestions for `{prefix}`:")?;
            if suggestions.is_empty() {
                writeln!(self.out, "  (no suggestions)")?;
            }
            for (position, suggestion) in suggestions.iter().enumerate() {
                writeln!(
                    self.out,
                    "  {}. {} ({})",
                    position + 1,
                    suggestion.product_name,
                    suggestion.category_path
                )?;
            }
        }
    }

    fn remove_category(&mut self) -> io::Result<()> {
        let Some(name) = self.ask_name("category to remove: ")? else {
            return Ok(());
        };
        if !self.catalog.remove_category(&name) {
            return writeln!(self.out, "category `{name}` not found");
        }
        self.catalog.rebuild_index();
        writeln!(self.out, "category `{name}` removed")
    }

    fn remove_subcategory(&mut self) -> io::Result<()> {
        let Some(category) = self.ask_existing_category()? else {
            return Ok(());
        };
        let Some(name) = self.ask_name("subcategory to remove: ")? else {
            return Ok(());
        };
        if !self.catalog.remove_subcategory(&category, &name) {
            return writeln!(self.out, "subcategory `{name}` not found in `{category}`");
        }
        self.catalog.rebuild_index();
        writeln!(self.out, "subcategory `{name}` removed from `{category}`")
    }

    fn remove_product(&mut self) -> io::Result<()> {
        let Some(category) = self.ask_existing_category()? else {
            return Ok(());
        };
        let subcategory = self.ask("subcategory (blank for none): ")?.filter(|name| !name.is_empty());
        let Some(product) = self.ask_name("product to remove: ")? else {
            return Ok(());
        };
        if !self.catalog.remove_product(&category, subcategory.as_deref(), &product) {
            return writeln!(self.out, "product `{product}` not found");
        }
        self.catalog.rebuild_index();
        writeln!(self.out, "product `{product}` removed")
    }
}

#[cfg(test)]
mod tests {
    use arbor_core::fixtures::demo_categories;
    use arbor_core::{Catalog, CatalogSettings};

    use super::run_session;

    fn scripted(script: &str) -> (Catalog, String) {
        let mut catalog = Catalog::with_categories(CatalogSettings::default(), demo_categories());
        let mut output = Vec::new();
        run_session(&mut catalog, script.as_bytes(), &mut output).expect("in-memory session");
        (catalog, String::from_utf8(output).expect("utf-8 output"))
    }

    #[test]
    fn inserts_and_removes_through_the_menu() {
        let (catalog, output) = scripted(
            "1\nPapelaria\n3\nPapelaria\nCaderno\n\n8\nBebidas\n\nRefrigerante\n6\nBananinha\n0\n",
        );

        assert!(output.contains("category `Papelaria` inserted"));
        assert!(output.contains("product `Caderno` added"));
        assert!(output.contains("product `Refrigerante` removed"));
        assert!(output.contains("category `Bananinha` removed"));
        assert!(output.ends_with("bye\n"));
        assert!(catalog.find_category("Papelaria").is_some_and(|c| c.product("Caderno").is_some()));
        assert!(catalog.find_category("Bebidas").is_some_and(|c| c.product("Refrigerante").is_none()));
        assert!(catalog.find_category("Bananinha").is_none());
        assert_eq!(catalog.validate(), Ok(()));
    }

    #[test]
    fn autocomplete_extends_prefix_until_blank_line() {
        let (_, output) = scripted("5\nc\nel\nx\n\n0\n");

        assert!(output.contains("suggestions for `c`:"));
        assert!(output.contains("suggestions for `cel`:\n  1. Celular (Eletrônicos)"));
        assert!(output.contains("suggestions for `celx`:\n  (no suggestions)"));
    }

    #[test]
    fn rejects_unknown_targets_and_invalid_options() {
        let (catalog, output) = scripted("7\nPadaria\n2\nBebidas\n\n42\n");

        assert!(output.contains("category `Padaria` not found"));
        assert!(output.contains("cancelled: a name is required"));
        assert!(output.contains("invalid option `42`"));
        assert_eq!(catalog.category_count(), 3);
    }

    #[test]
    fn product_insert_into_missing_subcategory_is_reported() {
        let (_, output) = scripted("3\nEletrônicos\nTablet\nTablets\n9\n0\n");

        assert!(output.contains("subcategory `Tablets` not found in `Eletrônicos`"));
        assert!(output.contains("=== Performance report ==="));
        assert!(output.contains("balanced: yes"));
    }
}
