use std::path::Path;

use tree_sitter::Language;

/// A tree-sitter grammar and the file extensions it is used for.
pub struct SourceLanguage {
    pub name: &'static str,
    pub language: Language,
    pub extensions: &'static [&'static str],
}

impl SourceLanguage {
    pub fn get_all() -> Vec<SourceLanguage> {
        vec![typescript(), tsx(), javascript()]
    }

    pub fn get_by_extension(ext: &str) -> Option<SourceLanguage> {
        Self::get_all()
            .into_iter()
            .find(|l| l.extensions.contains(&ext))
    }

    pub fn get_by_name(name: &str) -> Option<SourceLanguage> {
        Self::get_all().into_iter().find(|l| l.name == name)
    }

    pub fn for_path(path: &Path) -> Option<SourceLanguage> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        Self::get_by_extension(&ext.to_ascii_lowercase())
    }
}

fn typescript() -> SourceLanguage {
    SourceLanguage {
        name: "typescript",
        language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        extensions: &["ts", "mts", "cts"],
    }
}

// `<T>expr` casts are not valid TSX, so plain .ts keeps its own grammar.
fn tsx() -> SourceLanguage {
    SourceLanguage {
        name: "tsx",
        language: tree_sitter_typescript::LANGUAGE_TSX.into(),
        extensions: &["tsx"],
    }
}

fn javascript() -> SourceLanguage {
    SourceLanguage {
        name: "javascript",
        language: tree_sitter_javascript::LANGUAGE.into(),
        extensions: &["js", "jsx", "mjs", "cjs"],
    }
}
