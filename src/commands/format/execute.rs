use std::error::Error;
use std::fs;

use serde::Serialize;

use super::FormatCmd;
use crate::commands::{read_source, Context, Execute};
use crate::output::format_diagnostics;
use crate::sdl;

#[derive(Debug, Default, Serialize)]
pub struct FormatResult {
    pub file: String,
    pub canonical: String,
    /// Whether the canonical text differs from the source.
    pub changed: bool,
    pub written: bool,
}

impl Execute for FormatCmd {
    type Output = FormatResult;

    fn execute(self, _ctx: &Context) -> Result<Self::Output, Box<dyn Error>> {
        let source = read_source(&self.file)?;
        let schema = sdl::parse(&source);

        if !schema.is_valid() {
            return Err(format!(
                "Refusing to format invalid SDL in {}\n{}",
                self.file.display(),
                format_diagnostics(&schema.errors)
            )
            .into());
        }

        let canonical = sdl::serialize(&schema);
        let changed = canonical != source;
        let written = self.write && changed;

        if written {
            fs::write(&self.file, &canonical)
                .map_err(|e| format!("Failed to write {}: {}", self.file.display(), e))?;
        }

        Ok(FormatResult {
            file: self.file.display().to_string(),
            canonical,
            changed,
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_temp_sdl_file, sqlite_context, BLOG_SDL};
    use rstest::rstest;

    const MESSY: &str = "// users\nentity User { id: ID   @primary\n  name: string @nullable=false }\n";
    const TIDY: &str = "entity User {\n  id: ID @primary\n  name: string @nullable(false)\n}\n";

    #[rstest]
    fn test_format_prints_without_writing() {
        let file = create_temp_sdl_file(MESSY);
        let (_dir, ctx) = sqlite_context(None);

        let result = FormatCmd {
            file: file.path().to_path_buf(),
            write: false,
        }
        .execute(&ctx)
        .unwrap();

        assert_eq!(result.canonical, TIDY);
        assert!(result.changed);
        assert!(!result.written);
        assert_eq!(fs::read_to_string(file.path()).unwrap(), MESSY);
    }

    #[rstest]
    fn test_format_write_rewrites_file() {
        let file = create_temp_sdl_file(MESSY);
        let (_dir, ctx) = sqlite_context(None);

        let result = FormatCmd {
            file: file.path().to_path_buf(),
            write: true,
        }
        .execute(&ctx)
        .unwrap();

        assert!(result.written);
        assert_eq!(fs::read_to_string(file.path()).unwrap(), TIDY);
    }

    #[rstest]
    fn test_canonical_file_is_unchanged() {
        let file = create_temp_sdl_file(BLOG_SDL);
        let (_dir, ctx) = sqlite_context(None);

        let result = FormatCmd {
            file: file.path().to_path_buf(),
            write: true,
        }
        .execute(&ctx)
        .unwrap();

        assert!(!result.changed);
        assert!(!result.written);
    }

    #[rstest]
    fn test_invalid_source_is_refused() {
        let file = create_temp_sdl_file("entity A {\n  x: Ghost\n}\n");
        let (_dir, ctx) = sqlite_context(None);

        let err = FormatCmd {
            file: file.path().to_path_buf(),
            write: true,
        }
        .execute(&ctx)
        .unwrap_err();

        assert!(err.to_string().contains("line 2: type error"));
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "entity A {\n  x: Ghost\n}\n");
    }
}
