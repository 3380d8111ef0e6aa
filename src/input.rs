/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result, bail};
use rpassword::read_password;
use std::collections::HashMap;
use std::io::Write;
use std::process::Command;
use std::{fs, io};

/// Lets the user fill `values` in `$EDITOR`, one `Key: value` line per field.
/// With `skip`, the editor is not opened when every required field already has
/// a value. Fields listed in `optional` may be left empty.
pub fn handle_input(
    values: Vec<(String, Option<String>)>,
    skip: bool,
    optional: &[&str],
) -> Result<HashMap<String, String>> {
    if values.is_empty() {
        bail!("No input fields");
    }

    if skip
        && values
            .iter()
            .all(|(k, v)| v.is_some() || optional.contains(&k.as_str()))
    {
        return Ok(values
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or_default()))
            .collect());
    }

    let input_fields: String = values
        .iter()
        .map(|(k, v)| format!("{}: {}\n", k, v.as_deref().unwrap_or_default()))
        .collect();

    let path = std::env::temp_dir().join(format!("MINIJENKINS-INPUT-{}", std::process::id()));
    fs::write(&path, input_fields.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to open editor {}", editor))?;

    if !status.success() {
        let _ = fs::remove_file(&path);
        bail!("Failed to open editor {}", editor);
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    fs::remove_file(&path).ok();

    parse_input(&contents, &values, optional)
}

fn parse_input(
    contents: &str,
    values: &[(String, Option<String>)],
    optional: &[&str],
) -> Result<HashMap<String, String>> {
    let mut result: HashMap<String, String> = HashMap::new();

    for line in contents.lines().filter(|line| !line.trim().is_empty()) {
        let (key, value) = line.split_once(':').unwrap_or((line, ""));
        let (key, value) = (key.trim(), value.trim());

        if !values.iter().any(|(k, _)| k == key) {
            bail!("Invalid input field: {}", key);
        }

        if value.is_empty() && !optional.contains(&key) {
            bail!("{} cannot be empty.", key);
        }

        result.insert(key.to_string(), value.to_string());
    }

    Ok(result)
}

pub fn ask_for_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let inp = read_password().context("Failed to read password.")?;

    if inp.is_empty() {
        bail!("Password cannot be empty.");
    }

    Ok(inp)
}

pub fn ask_for_input(prompt: &str) -> Result<String> {
    print!("{}: ", prompt);
    io::stdout().flush()?;
    let mut inp = String::new();
    io::stdin()
        .read_line(&mut inp)
        .with_context(|| format!("Failed to read {}.", prompt))?;
    let inp = inp.trim().to_string();

    if inp.is_empty() {
        bail!("{} cannot be empty.", prompt);
    }

    Ok(inp)
}

pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;
    let mut inp = String::new();
    io::stdin().read_line(&mut inp)?;
    Ok(matches!(inp.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<(String, Option<String>)> {
        vec![
            ("Name".to_string(), None),
            ("Repository".to_string(), None),
            ("Description".to_string(), None),
        ]
    }

    #[test]
    fn test_values_keep_colons() {
        let input = parse_input(
            "Name: demo\nRepository: https://github.com/a/b\nDescription: \n",
            &fields(),
            &["Description"],
        )
        .unwrap();

        assert_eq!(input.get("Repository").unwrap(), "https://github.com/a/b");
        assert_eq!(input.get("Description").unwrap(), "");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = parse_input("Owner: me\n", &fields(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input field: Owner");
    }

    #[test]
    fn test_required_field_cannot_be_empty() {
        let err = parse_input("Name:\n", &fields(), &["Description"]).unwrap_err();
        assert_eq!(err.to_string(), "Name cannot be empty.");
    }

    #[test]
    fn test_skip_returns_prefilled_values() {
        let values = vec![
            ("Name".to_string(), Some("demo".to_string())),
            ("Description".to_string(), None),
        ];
        let input = handle_input(values, true, &["Description"]).unwrap();
        assert_eq!(input.get("Name").unwrap(), "demo");
        assert_eq!(input.get("Description").unwrap(), "");
    }
}
