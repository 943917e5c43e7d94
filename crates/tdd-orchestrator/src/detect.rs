//! Test-framework auto-detection from build manifests (§6 "Test-framework
//! auto-detection"). First match wins; a handful of file reads and string
//! matches, not a generalized build-system probe — this stays an "external
//! collaborator" the way §1 frames it, just implemented inline.

use std::path::Path;

/// Probe `project_root` for a recognized build manifest and return the test
/// command it implies, in the spec's fixed precedence order. `None` means no
/// framework was recognized.
pub fn detect_test_command(project_root: &Path) -> Option<String> {
    if let Some(pom) = read_to_string(project_root.join("pom.xml")) {
        if pom.contains("junit") {
            return Some("mvn test".to_string());
        }
    }

    if project_root.join("build.gradle").exists() || project_root.join("build.gradle.kts").exists() {
        let wrapper = if cfg!(windows) {
            project_root.join("gradlew.bat")
        } else {
            project_root.join("gradlew")
        };
        return Some(if wrapper.exists() {
            if cfg!(windows) {
                "gradlew.bat test".to_string()
            } else {
                "./gradlew test".to_string()
            }
        } else {
            "gradle test".to_string()
        });
    }

    if let Some(package_json) = read_to_string(project_root.join("package.json")) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&package_json) {
            if value.get("scripts").and_then(|s| s.get("test")).is_some() {
                return Some("npm test".to_string());
            }
        }
    }

    if project_root.join("pytest.ini").exists() {
        return Some("pytest".to_string());
    }
    if let Some(pyproject) = read_to_string(project_root.join("pyproject.toml")) {
        if pyproject.contains("pytest") {
            return Some("pytest".to_string());
        }
    }
    if project_root.join("setup.py").exists() {
        return Some("pytest".to_string());
    }

    None
}

fn read_to_string(path: impl AsRef<Path>) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn detects_maven_junit_project() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project><dependencies><dependency>junit</dependency></dependencies></project>").unwrap();
        assert_eq!(detect_test_command(dir.path()), Some("mvn test".to_string()));
    }

    #[test]
    fn maven_without_junit_is_not_detected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project></project>").unwrap();
        assert_eq!(detect_test_command(dir.path()), None);
    }

    #[test]
    fn detects_gradle_with_wrapper() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("build.gradle"), "").unwrap();
        std::fs::write(dir.path().join("gradlew"), "").unwrap();
        let expected = if cfg!(windows) { "gradlew.bat test" } else { "./gradlew test" };
        assert_eq!(detect_test_command(dir.path()), Some(expected.to_string()));
    }

    #[test]
    fn detects_gradle_without_wrapper() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("build.gradle.kts"), "").unwrap();
        assert_eq!(detect_test_command(dir.path()), Some("gradle test".to_string()));
    }

    #[test]
    fn detects_npm_test_script() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"scripts": {"test": "jest"}}"#).unwrap();
        assert_eq!(detect_test_command(dir.path()), Some("npm test".to_string()));
    }

    #[test]
    fn npm_without_test_script_is_not_detected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"scripts": {}}"#).unwrap();
        assert_eq!(detect_test_command(dir.path()), None);
    }

    #[test]
    fn detects_pytest_ini() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("pytest.ini"), "").unwrap();
        assert_eq!(detect_test_command(dir.path()), Some("pytest".to_string()));
    }

    #[test]
    fn detects_pyproject_referencing_pytest() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("pyproject.toml"), "[tool.pytest.ini_options]\n").unwrap();
        assert_eq!(detect_test_command(dir.path()), Some("pytest".to_string()));
    }

    #[test]
    fn no_manifest_detects_nothing() {
        let dir = tempdir().unwrap();
        assert_eq!(detect_test_command(dir.path()), None);
    }
}
