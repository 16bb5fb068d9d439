#![allow(dead_code)]

pub mod temp_files {
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// A route table written into its own temporary directory.
    ///
    /// The directory (and the file) is removed when this is dropped.
    pub struct TempTable {
        pub dir: TempDir,
        pub path: PathBuf,
    }

    impl TempTable {
        /// Overwrite the table in place.
        pub fn rewrite(&self, content: &str) {
            std::fs::write(&self.path, content).unwrap();
        }
    }

    /// Creates `routes.<ext>` holding `content`
    pub fn create_temp_table(content: &str, ext: &str) -> TempTable {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("routes.{ext}"));
        std::fs::write(&path, content).unwrap();
        TempTable { dir, path }
    }

    /// Creates a temporary table with yaml extension
    pub fn create_temp_yaml(content: &str) -> TempTable {
        create_temp_table(content, "yaml")
    }
}
