//! Command-line front end over `taxpost_core`.
//!
//! # Responsibility
//! - Open a term store database and a settings file.
//! - Print generated route rules, rendered links, and recovered terms.
//!
//! Usage: `taxpost <db> <settings.json> routes|render <item-uuid> [hint]|resolve <item-uuid> <url>`

use log::{error, info};
use std::error::Error;
use std::process::ExitCode;
use taxpost_core::{
    init_logging_from_env, open_db, PermalinkService, PermalinkSettings, RenderOptions,
    SqliteItemRepository, SqliteTermStore,
};
use uuid::Uuid;

const USAGE: &str =
    "usage: taxpost <db> <settings.json> routes | render <item-uuid> [hint] | resolve <item-uuid> <url>";

enum Command {
    Routes,
    Render { item: Uuid, hint: Option<String> },
    Resolve { item: Uuid, url: String },
}

struct Invocation {
    db_path: String,
    settings_path: String,
    command: Command,
}

fn main() -> ExitCode {
    if let Err(err) = init_logging_from_env() {
        eprintln!("logging disabled: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let [db_path, settings_path, command, rest @ ..] = args else {
        return Err("missing arguments".to_string());
    };
    let command = match (command.as_str(), rest) {
        ("routes", []) => Command::Routes,
        ("render", [item]) => Command::Render {
            item: parse_item_id(item)?,
            hint: None,
        },
        ("render", [item, hint]) => Command::Render {
            item: parse_item_id(item)?,
            hint: Some(hint.clone()),
        },
        ("resolve", [item, url]) => Command::Resolve {
            item: parse_item_id(item)?,
            url: url.clone(),
        },
        (other, _) => return Err(format!("unknown command or arguments: `{other}`")),
    };
    Ok(Invocation {
        db_path: db_path.clone(),
        settings_path: settings_path.clone(),
        command,
    })
}

fn parse_item_id(value: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("invalid item id `{value}`"))
}

fn run(invocation: Invocation) -> Result<(), Box<dyn Error>> {
    let settings = PermalinkSettings::from_path(&invocation.settings_path)?;
    let registry = settings.to_registry()?;
    let conn = open_db(&invocation.db_path)?;
    let terms = SqliteTermStore::try_new(&conn)?;
    for hierarchy in &settings.hierarchies {
        terms.upsert_hierarchy(hierarchy)?;
    }
    let items = SqliteItemRepository::try_new(&conn)?;
    let service = PermalinkService::new(&registry, &settings.site, terms, items);

    match invocation.command {
        Command::Routes => {
            for rule in service.routes(Vec::new())? {
                println!("{}\t{}", rule.pattern, rule.query);
            }
        }
        Command::Render { item, hint } => {
            let item = service.get_item(item)?;
            let fallback = format!(
                "{}?{}={}",
                settings.site.home_url(),
                item.item_type,
                item.slug
            );
            let link = service.item_permalink(
                &item,
                hint.as_deref(),
                &fallback,
                RenderOptions::default(),
            )?;
            println!("{link}");
        }
        Command::Resolve { item, url } => {
            let item = service.get_item(item)?;
            match service.recover_term(&item, &url)? {
                Some(slug) => println!("{slug}"),
                None => println!(),
            }
        }
    }

    info!("event=cli_run module=cli status=ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_args, Command};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_render_with_hint() {
        let invocation = parse_args(&args(&[
            "shop.db",
            "settings.json",
            "render",
            "8c9f6a3e-2f7b-4d0e-9d8a-4c1b2e3f4a5b",
            "tools",
        ]))
        .unwrap();
        assert_eq!(invocation.db_path, "shop.db");
        assert!(matches!(
            invocation.command,
            Command::Render { hint: Some(ref hint), .. } if hint == "tools"
        ));
    }

    #[test]
    fn rejects_bad_item_id_and_unknown_command() {
        assert!(parse_args(&args(&["a.db", "s.json", "render", "nope"])).is_err());
        assert!(parse_args(&args(&["a.db", "s.json", "purge"])).is_err());
        assert!(parse_args(&args(&["a.db"])).is_err());
    }

    #[test]
    fn parses_routes() {
        let invocation = parse_args(&args(&["a.db", "s.json", "routes"])).unwrap();
        assert!(matches!(invocation.command, Command::Routes));
    }
}
