use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;
use std::fmt::Display;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

/// Print one entity representation
pub fn record(item: &impl Display) {
    println!("  {}", item.to_string().style(theme().record.clone()));
}

/// Print entity representations as a bracketed list
pub fn records<T: Display>(items: &[T]) {
    println!("  {}", list(items).style(theme().record.clone()));
}

/// `[<a>, <b>]`
pub fn list<T: Display>(items: &[T]) -> String {
    let inner: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", inner.join(", "))
}

/// Print the outcome of a yes/no check
pub fn check(label: &str, passed: bool) {
    let icon = if passed { Icons::CHECK } else { Icons::CROSS };
    let value = passed.to_string();
    let value = if passed {
        value.style(theme().success.clone()).to_string()
    } else {
        value.style(theme().error.clone()).to_string()
    };
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}
