//! Structural tagging heuristics over `(path, content)`
//!
//! Pure, stateless classification used to enrich semantic documents and to
//! drive the query-time smart filter. None of this is exact; it only has to
//! be right often enough to narrow results.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static CONTROLLER_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"@(?:Rest)?Controller\b|@(?:Request|Get|Post|Put|Delete|Patch)Mapping\b|\b(?:app|router)\.(?:get|post|put|delete|patch)\s*\(|@app\.route\b",
    )
    .expect("controller pattern is valid")
});

static SERVICE_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@Service\b|@Injectable\b|\b(?:class|struct|interface|trait)\s+\w*Service\b")
        .expect("service pattern is valid")
});

static REPOSITORY_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"@Repository\b|@Entity\b|\bextends\s+(?:Jpa|Crud)Repository\b|\b(?:class|struct|interface|trait)\s+\w*(?:Repository|Dao|DAO)\b",
    )
    .expect("repository pattern is valid")
});

static TEST_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@Test\b|#\[(?:tokio::)?test\]|\bdef\s+test_\w+|\b(?:describe|it)\s*\(\s*['`\x22]")
        .expect("test pattern is valid")
});

static ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*@([A-Za-z_]\w*)").expect("annotation pattern is valid")
});

static TYPE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:class|interface|enum|struct|trait|record)\s+([A-Z]\w*)")
        .expect("type name pattern is valid")
});

/// Boolean structure tags derived from path and content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureTags {
    pub controller: bool,
    pub service: bool,
    pub repository: bool,
    pub test: bool,
}

impl StructureTags {
    pub fn detect(path: &str, content: &str) -> Self {
        Self {
            controller: is_controller(path, content),
            service: is_service(path, content),
            repository: is_repository(path, content),
            test: is_test(path, content),
        }
    }
}

fn file_stem_lower(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
        .to_lowercase()
}

/// Looks like a request-handling file
pub fn is_controller(path: &str, content: &str) -> bool {
    let name = file_stem_lower(path);
    name.contains("controller")
        || name.contains("handler")
        || name.contains("routes")
        || CONTROLLER_CONTENT.is_match(content)
}

/// Looks like a service-layer file
pub fn is_service(path: &str, content: &str) -> bool {
    file_stem_lower(path).contains("service") || SERVICE_CONTENT.is_match(content)
}

/// Looks like a data-access file
pub fn is_repository(path: &str, content: &str) -> bool {
    let name = file_stem_lower(path);
    name.contains("repository")
        || name.contains("dao")
        || REPOSITORY_CONTENT.is_match(content)
}

/// Looks like a test file
pub fn is_test(path: &str, content: &str) -> bool {
    let lower = path.to_lowercase();
    let in_test_dir = lower
        .split(['/', '\\'])
        .any(|segment| matches!(segment, "test" | "tests" | "__tests__" | "spec"));
    let name = file_stem_lower(path);
    in_test_dir
        || name.starts_with("test_")
        || name.contains("test.")
        || name.contains("tests.")
        || name.contains(".spec.")
        || TEST_CONTENT.is_match(content)
}

/// Annotation names (`@Service`, `@GetMapping`) at the start of a line, in
/// first-seen order without duplicates
pub fn extract_annotations(content: &str) -> Vec<String> {
    dedup_in_order(
        ANNOTATION
            .captures_iter(content)
            .filter_map(|c| c.get(1).map(|m| format!("@{}", m.as_str()))),
    )
}

/// Declared type names (`class Foo`, `struct Bar`) in first-seen order
pub fn extract_type_names(content: &str) -> Vec<String> {
    dedup_in_order(
        TYPE_NAME
            .captures_iter(content)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string())),
    )
}

fn dedup_in_order(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_by_path_and_content() {
        assert!(is_controller("src/web/UserController.java", ""));
        assert!(is_controller("api/handler.go", ""));
        assert!(is_controller(
            "src/Api.java",
            "@RestController\npublic class Api {}"
        ));
        assert!(is_controller("server.js", "router.get('/users', list)"));
        assert!(!is_controller("src/util/Strings.java", "class Strings {}"));
    }

    #[test]
    fn test_service_detection() {
        assert!(is_service("src/UserService.java", ""));
        assert!(is_service("src/Billing.java", "@Service\nclass Billing {}"));
        assert!(is_service("billing.rs", "pub struct BillingService {}"));
        assert!(!is_service("src/Main.java", "class Main {}"));
    }

    #[test]
    fn test_repository_detection() {
        assert!(is_repository("src/UserRepository.java", ""));
        assert!(is_repository("src/userDao.ts", ""));
        assert!(is_repository(
            "src/Users.java",
            "interface Users extends JpaRepository<User, Long> {}"
        ));
        assert!(!is_repository("src/Main.java", "class Main {}"));
    }

    #[test]
    fn test_test_detection() {
        assert!(is_test("src/test/java/FooTest.java", ""));
        assert!(is_test("tests/integration.rs", ""));
        assert!(is_test("pkg/test_utils.py", ""));
        assert!(is_test("web/app.spec.ts", ""));
        assert!(is_test("src/Foo.java", "@Test\nvoid works() {}"));
        assert!(is_test("calc.py", "def test_add():\n    pass"));
        assert!(!is_test("src/attestation.rs", "fn attest() {}"));
    }

    #[test]
    fn test_structure_tags_detect() {
        let tags = StructureTags::detect("src/OrderService.java", "@Service\nclass OrderService {}");
        assert!(tags.service);
        assert!(!tags.controller);
        assert!(!tags.repository);
        assert!(!tags.test);
    }

    #[test]
    fn test_extract_annotations() {
        let content = "@RestController\n@RequestMapping(\"/api\")\npublic class A {\n  @GetMapping\n  @GetMapping\n}";
        assert_eq!(
            extract_annotations(content),
            vec!["@RestController", "@RequestMapping", "@GetMapping"]
        );
        assert!(extract_annotations("let email = \"a@b.c\";").is_empty());
    }

    #[test]
    fn test_extract_type_names() {
        let content = "public class UserController {}\nenum Role {}\nstruct Point;\nclass lowercase {}";
        assert_eq!(
            extract_type_names(content),
            vec!["UserController", "Role", "Point"]
        );
    }
}
