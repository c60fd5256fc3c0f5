//! Role listing command handler.

use roleplex::roles::RoleProvider;

/// Print the role tags known to the binary.
pub(crate) fn cmd_roles() {
    let provider = RoleProvider::with_builtin_roles();
    println!("Available roles:");
    for role_type in provider.role_types() {
        let tools = provider
            .create_role(role_type)
            .map(|role| role.get_tools())
            .unwrap_or_default();
        if tools.is_empty() {
            println!("  {}", role_type);
        } else {
            let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
            println!("  {:<16} tools: {}", role_type, names.join(", "));
        }
    }
}
