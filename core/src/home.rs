use dirs::home_dir;
use std::path::PathBuf;

/// Returns the path to the chatbot configuration directory, which can be
/// specified by the `CHATBOT_HOME` environment variable. If not set, defaults
/// to `~/.chatbot-ollama`.
///
/// - If `CHATBOT_HOME` is set, the value must exist and be a directory. The
///   value will be canonicalized and this function will Err otherwise.
/// - If `CHATBOT_HOME` is not set, this function does not verify that the
///   directory exists.
pub fn find_chatbot_home() -> std::io::Result<PathBuf> {
    let home_env = std::env::var("CHATBOT_HOME")
        .ok()
        .filter(|val| !val.is_empty());
    find_chatbot_home_from_env(home_env.as_deref())
}

fn find_chatbot_home_from_env(home_env: Option<&str>) -> std::io::Result<PathBuf> {
    match home_env {
        Some(val) => {
            let path = PathBuf::from(val);
            let metadata = std::fs::metadata(&path).map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("CHATBOT_HOME points to {val:?}, but that path does not exist"),
                ),
                _ => std::io::Error::new(
                    err.kind(),
                    format!("failed to read CHATBOT_HOME {val:?}: {err}"),
                ),
            })?;

            if !metadata.is_dir() {
                Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("CHATBOT_HOME points to {val:?}, but that path is not a directory"),
                ))
            } else {
                path.canonicalize().map_err(|err| {
                    std::io::Error::new(
                        err.kind(),
                        format!("failed to canonicalize CHATBOT_HOME {val:?}: {err}"),
                    )
                })
            }
        }
        None => {
            let mut p = home_dir().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not find home directory",
                )
            })?;
            p.push(".chatbot-ollama");
            Ok(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn env_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let missing = missing.to_string_lossy().to_string();

        let err = find_chatbot_home_from_env(Some(&missing)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn env_path_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "").unwrap();
        let file = file.to_string_lossy().to_string();

        let err = find_chatbot_home_from_env(Some(&file)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn env_path_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let value = dir.path().to_string_lossy().to_string();

        let home = find_chatbot_home_from_env(Some(&value)).unwrap();
        assert_eq!(home, dir.path().canonicalize().unwrap());
    }
}
