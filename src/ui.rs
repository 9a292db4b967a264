use colored::Colorize;
use containerkit::ChangeClass;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print one container with its change classification
pub fn classified(name: &str, class: ChangeClass) {
    let label = match class {
        ChangeClass::Unchanged => class.label().dimmed(),
        ChangeClass::ConfigOnlyChanged => class.label().yellow(),
        ChangeClass::FullyChanged => class.label().red(),
    };
    println!("  {name:<24} {label}");
}

/// Print a list of containers under an action verb, if non-empty
pub fn action<'a>(verb: &str, names: impl IntoIterator<Item = &'a str>) {
    let names: Vec<&str> = names.into_iter().collect();
    if names.is_empty() {
        return;
    }
    println!("  {:<10} {}", verb.bold(), names.join(", "));
}
