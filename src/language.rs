/// Editor language mode for a file name, derived from the extension and
/// never stored. Unknown extensions fall back to the given default mode.
pub fn mode_for_file(file_name: &str, default_mode: &str) -> String {
    match detect_lang::from_path(file_name) {
        Some(lang) => match lang.id().to_lowercase().as_str() {
            // detect-lang ids differ from the editor's mode names for a few
            // languages; translate those, pass the rest through.
            "cpp" | "c++" => "c_cpp".to_string(),
            "go" => "golang".to_string(),
            "shell" | "bash" => "sh".to_string(),
            id => id.to_string(),
        },
        None => default_mode.to_string(),
    }
}

/// The completion service speaks its own language tags; the only editor-mode
/// alias it does not understand is `c_cpp`.
pub fn completion_language(mode: &str) -> &str {
    match mode {
        "c_cpp" => "cpp",
        other => other,
    }
}

fn extension(file_name: &str) -> &str {
    file_name.rsplit('.').next().unwrap_or("")
}

fn stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    }
}

/// Starter content for a freshly created file.
pub fn file_template(file_name: &str) -> String {
    match extension(file_name).to_lowercase().as_str() {
        "js" | "jsx" | "mjs" => {
            format!("console.log(\"Hello from {}\");", file_name)
        }
        "py" | "pyw" => format!("print(\"Hello from {}\")", file_name),
        "cpp" | "cc" | "cxx" => format!(
            "#include <iostream>\nusing namespace std;\n\nint main() {{\n    cout << \"Hello from {}\" << endl;\n    return 0;\n}}",
            file_name
        ),
        "c" => format!(
            "#include <stdio.h>\n\nint main() {{\n    printf(\"Hello from {}\\n\");\n    return 0;\n}}",
            file_name
        ),
        "java" => format!(
            "public class {} {{\n    public static void main(String[] args) {{\n        System.out.println(\"Hello from {}\");\n    }}\n}}",
            stem(file_name),
            file_name
        ),
        "html" | "htm" => format!(
            "<!DOCTYPE html>\n<html>\n<head>\n    <title>{}</title>\n</head>\n<body>\n    <h1>Hello from {}</h1>\n</body>\n</html>",
            file_name, file_name
        ),
        "css" => format!(
            "/* Styles for {} */\nbody {{\n    font-family: Arial, sans-serif;\n    margin: 0;\n    padding: 20px;\n}}",
            file_name
        ),
        _ => format!("// Welcome to {}", file_name),
    }
}

#[cfg(test)]
mod language_tests {
    use super::*;

    #[test]
    fn test_mode_for_common_extensions() {
        assert_eq!(mode_for_file("main.py", "javascript"), "python");
        assert_eq!(mode_for_file("app.rs", "javascript"), "rust");
        assert_eq!(mode_for_file("solver.cpp", "javascript"), "c_cpp");
        assert_eq!(mode_for_file("server.go", "javascript"), "golang");
    }

    #[test]
    fn test_unknown_extension_uses_default() {
        assert_eq!(mode_for_file("notes.xyzzy", "javascript"), "javascript");
        assert_eq!(mode_for_file("README", "python"), "python");
    }

    #[test]
    fn test_completion_language_alias() {
        assert_eq!(completion_language("c_cpp"), "cpp");
        assert_eq!(completion_language("python"), "python");
        assert_eq!(completion_language("javascript"), "javascript");
    }

    #[test]
    fn test_templates() {
        assert_eq!(
            file_template("main.py"),
            "print(\"Hello from main.py\")"
        );
        assert!(file_template("Main.java").starts_with("public class Main {"));
        assert_eq!(file_template("data.bin"), "// Welcome to data.bin");
    }
}
