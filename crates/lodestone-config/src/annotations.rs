use std::any::type_name;

use documented::{Documented, DocumentedFields};
use toml_edit::{Decor, Item, RawString, Table};
use tracing::warn;

use crate::error::{ConfigError, Result};

fn as_comment_block(docs: &str) -> String {
    docs.lines()
        .map(|line| match line {
            "" => "#\n".to_string(),
            text => format!("# {text}\n"),
        })
        .collect()
}

/// Writes `docs` as `#` comment lines in front of `decor`, after whatever prefix it
/// already carries.
pub fn prepend_doc_comments(decor: &mut Decor, docs: &str) {
    let existing = decor
        .prefix()
        .and_then(RawString::as_str)
        .unwrap_or_default()
        .to_string();
    let separator = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n#\n"
    };
    decor.set_prefix(format!("{existing}{separator}{}", as_comment_block(docs)));
}

/// Decorates every key of `table` with the matching field docs of `T`.
///
/// Nested tables also get the type level docs of `T`.
pub fn annotate_toml_table<T>(table: &mut Table, is_root: bool) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    if !is_root {
        prepend_doc_comments(table.decor_mut(), T::DOCS);
    }

    for (mut key, item) in table.iter_mut() {
        let name = key.get().to_string();
        let Ok(docs) = T::get_field_docs(&name) else {
            warn!("{} has no docs for field '{}'", type_name::<T>(), name);
            continue;
        };

        let decor = match item {
            Item::None => return Err(ConfigError::UnexpectedTomlItem(name)),
            Item::Value(_) => key.leaf_decor_mut(),
            Item::Table(sub) => sub.decor_mut(),
            Item::ArrayOfTables(array) => match array.iter_mut().next() {
                Some(first) => first.decor_mut(),
                None => continue,
            },
        };
        prepend_doc_comments(decor, docs);
    }

    Ok(())
}
