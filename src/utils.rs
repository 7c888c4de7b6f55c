use std::{fs, io};

pub fn create_folder_if_not_exists(dir: &str) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// Bytes needed for a dense `rows` by `columns` matrix of complex doubles, in GiB
pub fn dense_complex_gigabytes(rows: usize, columns: usize) -> f64 {
    (rows as f64 * columns as f64 * 16.) / (1024. * 1024. * 1024.)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_complex_gigabytes() {
        assert_eq!(dense_complex_gigabytes(0, 10), 0.);
        assert_eq!(dense_complex_gigabytes(8192, 8192), 1.);
        assert_eq!(dense_complex_gigabytes(16_384, 8192), 2.);
    }

    #[test]
    fn test_create_folder_is_idempotent() {
        let dir = std::env::temp_dir().join(format!("folder_{}", std::process::id()));
        let dir = dir.to_string_lossy().to_string();

        create_folder_if_not_exists(&dir).unwrap();
        create_folder_if_not_exists(&dir).unwrap();

        assert!(std::path::Path::new(&dir).is_dir());
        fs::remove_dir(&dir).unwrap();
    }
}
