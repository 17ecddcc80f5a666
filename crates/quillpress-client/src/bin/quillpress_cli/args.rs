use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "quillpress-cli", version, about = "quillpress blog API CLI", long_about = None)]
pub struct Cli {
    /// Site base URL, e.g. <https://blog.example.com>
    #[arg(long, env = "QUILLPRESS_SITE_URL")]
    pub site: Option<String>,

    /// Path to a file holding the session token (takes precedence over env)
    #[arg(long, env = "QUILLPRESS_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Session token from env (no CLI flag, to keep it out of shell history)
    #[arg(hide = true, env = "QUILLPRESS_TOKEN")]
    pub token_env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Public post reads (no token needed)
    Feed(FeedArgs),
    /// Admin post management
    Posts(PostsArgs),
    /// Admin category management
    Categories(CategoriesArgs),
    /// Upload a thumbnail image
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Sign in with email and password and print the session token
    SignIn(SignInArgs),
}

#[derive(Parser, Debug)]
pub struct FeedArgs {
    #[command(subcommand)]
    pub action: FeedCmd,
}

#[derive(Subcommand, Debug)]
pub enum FeedCmd {
    /// List published posts, newest first
    List,
    /// Show one post
    Get { id: i64 },
}

#[derive(Parser, Debug)]
pub struct PostsArgs {
    #[command(subcommand)]
    pub action: PostsCmd,
}

#[derive(Args, Debug, Clone)]
pub struct PostFields {
    #[arg(long)]
    pub title: String,
    /// Inline HTML content
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,
    /// Read HTML content from a file
    #[arg(long)]
    pub content_file: Option<PathBuf>,
    /// Storage key of an uploaded thumbnail
    #[arg(long)]
    pub thumbnail_key: Option<String>,
    /// Category id; repeat for several
    #[arg(long = "category", value_name = "ID")]
    pub categories: Vec<i64>,
}

#[derive(Subcommand, Debug)]
pub enum PostsCmd {
    List,
    Get {
        id: i64,
    },
    Create {
        #[command(flatten)]
        fields: PostFields,
    },
    Update {
        id: i64,
        #[command(flatten)]
        fields: PostFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Parser, Debug)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    pub action: CategoriesCmd,
}

#[derive(Subcommand, Debug)]
pub enum CategoriesCmd {
    List,
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct SignInArgs {
    /// Session provider base URL
    #[arg(long, env = "QUILLPRESS_AUTH_URL")]
    pub provider_url: String,

    /// Public API key of the session provider
    #[arg(long, env = "QUILLPRESS_AUTH_KEY")]
    pub provider_key: String,

    #[arg(long)]
    pub email: String,

    /// Password from env only
    #[arg(hide = true, env = "QUILLPRESS_PASSWORD")]
    pub password: Option<String>,
}
