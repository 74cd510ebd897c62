use crate::{emit_success, OutputMode};
use clap::ValueEnum;
use ormlet::config::{ensure_db_dir, write_config, OrmletConfig};
use ormlet::models::{basic, relational};
use ormlet::ui::{self, Icons};
use ormlet::{Database, Registry};
use std::path::{Path, PathBuf};

/// Model set selector for `ormlet schema`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    Basic,
    Relational,
}

impl Variant {
    fn registry(self) -> ormlet::Result<Registry> {
        match self {
            Variant::Basic => basic::registry(),
            Variant::Relational => relational::registry(),
        }
    }
}

pub struct RunContext {
    pub output_mode: OutputMode,
    /// `None` opens a fresh in-memory database
    pub database: Option<PathBuf>,
}

impl RunContext {
    fn open(&self, registry: Registry) -> anyhow::Result<Database> {
        match &self.database {
            Some(path) => {
                ensure_db_dir(path)?;
                Ok(Database::open(path, registry)?)
            }
            None => Ok(Database::open_in_memory(registry)?),
        }
    }

    fn database_label(&self) -> String {
        self.database
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ormlet::config::IN_MEMORY.to_string())
    }
}

pub fn run_basic(ctx: &RunContext) -> anyhow::Result<()> {
    let mut db = ctx.open(basic::registry()?)?;

    let mut session = db.session();
    session.add(basic::User::new("Shubham", "shubham@gmail.com"));
    session.add(basic::User::new("sawant", "sawant@gmail.com"));
    session.commit()?;
    let users = session.query::<basic::User>().all()?;
    drop(session);

    let stats = db.stats()?;

    if ctx.output_mode.is_human() {
        ui::header("Basic mapping");
        ui::info(&format!("{} Database", Icons::DATABASE), &ctx.database_label());
        ui::section("query(User).all()");
        ui::records(&users);
        ui::section(&format!("{} Tables", Icons::STATS));
        println!("{}", ui::stats_table(&stats));
    } else {
        let data = serde_json::json!({
            "database": ctx.database_label(),
            "users": users,
            "stats": stats,
        });
        emit_success(ctx.output_mode, "basic", data)?;
    }
    Ok(())
}

/// Everything the second relational transaction reads back
struct RelationalReport {
    user: relational::User,
    auth: relational::UserAuth,
    posts: Vec<relational::UserPost>,
    password_ok: bool,
    wrong_password_ok: bool,
    filtered: Vec<relational::UserPost>,
    filtered_described: Vec<String>,
}

pub fn run_relational(ctx: &RunContext) -> anyhow::Result<()> {
    use relational::{User, UserPost};

    let mut db = ctx.open(relational::registry()?)?;

    db.transaction(|s| {
        let user = s.add(User::new("Arjan", "Arjan@arjancodes.com", "password"));
        s.add(UserPost::new(user, "Hello World!1"));
        s.add(UserPost::new(user, "Hello World!2"));
        Ok(())
    })?;

    let report = db.transaction(|s| {
        let Some(mut user) = s.query::<User>().first()? else {
            return Ok(None);
        };
        let Some(auth) = user.load_auth(s)?.cloned() else {
            return Ok(None);
        };
        let posts = user.posts(s)?;

        let filtered = s
            .query::<UserPost>()
            .filter_eq("content", "Hello World!2")
            .all()?;
        let mut filtered_described = Vec::with_capacity(filtered.len());
        for post in &filtered {
            if let Some(mut owner) = post.user(s)? {
                owner.load_auth(s)?;
                filtered_described.push(post.describe(&owner));
            }
        }

        Ok(Some(RelationalReport {
            password_ok: auth.check_password("password"),
            wrong_password_ok: auth.check_password("wrongpassword"),
            user,
            auth,
            posts,
            filtered,
            filtered_described,
        }))
    })?;

    let Some(report) = report else {
        anyhow::bail!("no user found after the first transaction");
    };
    let stats = db.stats()?;

    if ctx.output_mode.is_human() {
        let posts_described: Vec<String> =
            report.posts.iter().map(|p| p.describe(&report.user)).collect();

        ui::header("Relational mapping");
        ui::info(&format!("{} Database", Icons::DATABASE), &ctx.database_label());
        ui::section(&format!("{} query(User).first()", Icons::PERSON));
        ui::record(&report.user);
        ui::record(&report.auth);
        ui::records(&posts_described);
        ui::section(&format!("{} Password checks", Icons::KEY));
        ui::check("Password check", report.password_ok);
        ui::check("Password check", report.wrong_password_ok);
        ui::section(&format!("{} UserPost.content == \"Hello World!2\"", Icons::MAG));
        ui::records(&report.filtered_described);
        ui::section(&format!("{} Tables", Icons::STATS));
        println!("{}", ui::stats_table(&stats));
    } else {
        let data = serde_json::json!({
            "database": ctx.database_label(),
            "user": report.user,
            "auth": report.auth,
            "posts": report.posts,
            "password_checks": {
                "password": report.password_ok,
                "wrongpassword": report.wrong_password_ok,
            },
            "filtered": report.filtered,
            "stats": stats,
        });
        emit_success(ctx.output_mode, "relational", data)?;
    }
    Ok(())
}

pub fn run_schema(ctx: &RunContext, variant: Variant) -> anyhow::Result<()> {
    let statements = variant.registry()?.schema_statements()?;

    if ctx.output_mode.is_human() {
        ui::header(&format!("Schema ({:?})", variant).to_lowercase());
        for stmt in &statements {
            println!("{};", stmt);
        }
    } else {
        let data = serde_json::json!({ "statements": statements });
        emit_success(ctx.output_mode, "schema", data)?;
    }
    Ok(())
}

pub fn run_init(
    ctx: &RunContext,
    path: &Path,
    config: &OrmletConfig,
    force: bool,
) -> anyhow::Result<()> {
    let overwriting = force && path.exists();
    write_config(path, config, force)?;

    if ctx.output_mode.is_human() {
        if overwriting {
            ui::warn(&format!("Overwrote existing {}", path.display()));
        }
        ui::success(&format!("Wrote {}", path.display()));
        println!("{}", ui::dim("Set `database` to a file path to keep data between runs."));
    } else {
        let data = serde_json::json!({ "path": path.display().to_string(), "config": config });
        emit_success(ctx.output_mode, "init", data)?;
    }
    Ok(())
}
