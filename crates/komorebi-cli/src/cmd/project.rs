use crate::context::ToolContext;
use crate::output::{print_json, print_table};
use crate::tools::show_project::project_error;
use crate::tools::update_project_status::UpdateProjectStatusTool;
use crate::tools::update_section::write_section;
use crate::tools::KomorebiTool;
use anyhow::Context;
use clap::Subcommand;
use komorebi_core::types::Collection;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// List projects, most important first
    List,
    /// Print a project record as stored
    Show {
        /// Project name or file stem (case-insensitive)
        name: String,
    },
    /// Set a project's status (active, paused, completed, archived)
    Status { name: String, status: String },
    /// Replace or append a `## ` section
    Section {
        name: String,
        /// Heading text without the `## ` prefix
        section: String,
        /// New section content; read from --file or stdin when omitted
        content: Option<String>,
        /// Read content from a file (`-` for stdin)
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
        /// Collection holding the record
        #[arg(long, default_value = "projects")]
        collection: Collection,
    },
}

pub fn run(ctx: &ToolContext, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProjectSubcommand::List => list(ctx, json),
        ProjectSubcommand::Show { name } => show(ctx, &name, json),
        ProjectSubcommand::Status { name, status } => {
            let args = serde_json::json!({ "name": name, "status": status });
            let message = UpdateProjectStatusTool
                .call(&args, ctx)
                .map_err(anyhow::Error::msg)?;
            println!("{message}");
            Ok(())
        }
        ProjectSubcommand::Section {
            name,
            section,
            content,
            file,
            collection,
        } => {
            let content = section_content(content, file.as_deref())?;
            let message = write_section(ctx, collection, &name, &section, &content)
                .map_err(anyhow::Error::msg)?;
            println!("{message}");
            Ok(())
        }
    }
}

fn list(ctx: &ToolContext, json: bool) -> anyhow::Result<()> {
    let projects = ctx
        .store
        .list(Collection::Projects)
        .context("failed to list projects")?;

    if json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!(
            "No projects. Add one under {}/",
            ctx.data_dir().join("projects").display()
        );
        return Ok(());
    }

    let rows = projects
        .iter()
        .map(|p| {
            let status = match (&p.error, &p.status) {
                (Some(_), _) => "error".to_string(),
                (None, Some(s)) => s.clone(),
                (None, None) => "-".to_string(),
            };
            vec![
                p.id.clone(),
                p.name.clone(),
                status,
                format!("P{}", p.priority),
                p.repo.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "STATUS", "PRIORITY", "REPO"], rows);

    for p in projects.iter().filter(|p| p.error.is_some()) {
        eprintln!("warning: {}: {}", p.id, p.error.as_deref().unwrap_or_default());
    }
    Ok(())
}

fn show(ctx: &ToolContext, name: &str, json: bool) -> anyhow::Result<()> {
    let text = ctx
        .store
        .read(Collection::Projects, name)
        .map_err(|e| anyhow::Error::msg(project_error(ctx, name, e)))?;
    if json {
        print_json(&serde_json::json!({ "name": name, "text": text }))
    } else {
        print!("{text}");
        Ok(())
    }
}

fn section_content(content: Option<String>, file: Option<&Path>) -> anyhow::Result<String> {
    match (content, file) {
        (Some(_), Some(_)) => {
            anyhow::bail!("pass section content either inline or with --file, not both")
        }
        (Some(content), None) => Ok(content),
        (None, Some(path)) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        (None, _) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read section content from stdin")?;
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::{context, project, write_project};
    use tempfile::TempDir;

    #[test]
    fn status_then_show() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "demo", &project("demo", "active", 1, "x"));
        let ctx = context(&dir);

        run(
            &ctx,
            ProjectSubcommand::Status {
                name: "demo".into(),
                status: "paused".into(),
            },
            false,
        )
        .unwrap();
        let text = ctx.store.read(Collection::Projects, "demo").unwrap();
        assert!(text.contains("status: paused"));
    }

    #[test]
    fn invalid_status_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "demo", &project("demo", "active", 1, "x"));
        let ctx = context(&dir);
        let err = run(
            &ctx,
            ProjectSubcommand::Status {
                name: "demo".into(),
                status: "done".into(),
            },
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("無效的狀態"));
    }

    #[test]
    fn missing_project_lists_alternatives() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "demo", &project("demo", "active", 1, "x"));
        let ctx = context(&dir);
        let err = show(&ctx, "nope", false).unwrap_err();
        assert_eq!(err.to_string(), "找不到專案：nope\n可用的專案：demo");
    }

    #[test]
    fn section_content_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("body.md");
        std::fs::write(&path, "- 新內容\n").unwrap();
        assert_eq!(section_content(None, Some(&path)).unwrap(), "- 新內容\n");
        assert_eq!(section_content(Some("inline".into()), None).unwrap(), "inline");
        assert!(section_content(Some("inline".into()), Some(&path)).is_err());
    }
}
