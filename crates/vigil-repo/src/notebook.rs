use serde::Deserialize;
use vigil_core::VigilError;

#[derive(Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<Cell>,
}

#[derive(Deserialize)]
struct Cell {
    #[serde(default)]
    cell_type: String,
    /// Notebook sources are either a list of lines or one string.
    #[serde(default)]
    source: CellSource,
}

#[derive(Deserialize, Default)]
#[serde(untagged)]
enum CellSource {
    Lines(Vec<String>),
    Text(String),
    #[default]
    Empty,
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            CellSource::Lines(lines) => lines.concat(),
            CellSource::Text(text) => text,
            CellSource::Empty => String::new(),
        }
    }
}

/// Extract the code cells of a Jupyter notebook as one Python source blob.
///
/// Non-code cells and blank code cells are dropped; remaining cells are
/// joined with a blank line between them.
///
/// # Errors
///
/// Returns [`VigilError::Serialization`] if the content is not valid
/// notebook JSON.
///
/// # Examples
///
/// ```
/// use vigil_repo::notebook::extract_code_cells;
///
/// let nb = r##"{"cells": [
///     {"cell_type": "markdown", "source": ["# Title"]},
///     {"cell_type": "code", "source": ["x = 1\n", "y = 2"]},
///     {"cell_type": "code", "source": "print(x + y)"}
/// ]}"##;
/// let code = extract_code_cells(nb).unwrap();
/// assert_eq!(code, "x = 1\ny = 2\n\nprint(x + y)");
/// ```
pub fn extract_code_cells(content: &str) -> Result<String, VigilError> {
    let notebook: Notebook = serde_json::from_str(content)?;
    let cells: Vec<String> = notebook
        .cells
        .into_iter()
        .filter(|c| c.cell_type == "code")
        .map(|c| c.source.into_text())
        .filter(|s| !s.trim().is_empty())
        .collect();
    Ok(cells.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_markdown_and_empty_cells() {
        let nb = r##"{"cells": [
            {"cell_type": "markdown", "source": ["# notes"]},
            {"cell_type": "code", "source": ["   \n"]},
            {"cell_type": "code", "source": ["import os\n"]}
        ]}"##;
        assert_eq!(extract_code_cells(nb).unwrap(), "import os\n");
    }

    #[test]
    fn handles_missing_cells_key() {
        assert_eq!(extract_code_cells("{}").unwrap(), "");
    }

    #[test]
    fn malformed_notebook_is_an_error() {
        assert!(extract_code_cells("not json").is_err());
    }
}
