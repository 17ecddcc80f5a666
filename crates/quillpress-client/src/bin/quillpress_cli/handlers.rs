use std::fs;
use std::path::PathBuf;

use quillpress_api_types::{PostResponse, PostsResponse};
use quillpress_client::{AuthClient, AuthMode, CategoryForm, PostForm, SessionHandle};

use crate::args::{CategoriesCmd, FeedCmd, PostFields, PostsCmd, SignInArgs};
use crate::ctx::{CliError, Ctx, settle};
use crate::print::print_json;

pub async fn feed(ctx: &Ctx, cmd: FeedCmd) -> Result<(), CliError> {
    let anyone = SessionHandle::resolved(None).current();
    match cmd {
        FeedCmd::List => {
            let state = ctx
                .fetch
                .fetch::<PostsResponse>(Some("api/posts"), AuthMode::Public, &anyone)
                .await;
            print_json(&settle(state)?)
        }
        FeedCmd::Get { id } => {
            let endpoint = format!("api/posts/{id}");
            let state = ctx
                .fetch
                .fetch::<PostResponse>(Some(&endpoint), AuthMode::Public, &anyone)
                .await;
            print_json(&settle(state)?)
        }
    }
}

pub async fn posts(ctx: &Ctx, cmd: PostsCmd) -> Result<(), CliError> {
    ctx.require_token()?;
    match cmd {
        PostsCmd::List => print_json(&settle(ctx.admin.posts().await)?),
        PostsCmd::Get { id } => print_json(&settle(ctx.admin.post(id).await)?),
        PostsCmd::Create { fields } => {
            let body = post_form(fields)?
                .to_request()
                .map_err(|errors| CliError::InvalidInput(format!("{errors:?}")))?;
            print_json(&ctx.admin.create_post(&body).await?)
        }
        PostsCmd::Update { id, fields } => {
            let body = post_form(fields)?
                .to_request()
                .map_err(|errors| CliError::InvalidInput(format!("{errors:?}")))?;
            print_json(&ctx.admin.update_post(id, &body).await?)
        }
        PostsCmd::Delete { id } => print_json(&ctx.admin.delete_post(id).await?),
    }
}

pub async fn categories(ctx: &Ctx, cmd: CategoriesCmd) -> Result<(), CliError> {
    ctx.require_token()?;
    match cmd {
        CategoriesCmd::List => print_json(&settle(ctx.admin.categories().await)?),
        CategoriesCmd::Get { id } => print_json(&settle(ctx.admin.category(id).await)?),
        CategoriesCmd::Create { name } => {
            let body = CategoryForm { name }
                .to_request()
                .map_err(|message| CliError::InvalidInput(message.to_string()))?;
            print_json(&ctx.admin.create_category(&body).await?)
        }
        CategoriesCmd::Update { id, name } => {
            let body = CategoryForm { name }
                .to_request()
                .map_err(|message| CliError::InvalidInput(message.to_string()))?;
            print_json(&ctx.admin.update_category(id, &body).await?)
        }
        CategoriesCmd::Delete { id } => print_json(&ctx.admin.delete_category(id).await?),
    }
}

pub async fn upload(ctx: &Ctx, file: PathBuf) -> Result<(), CliError> {
    ctx.require_token()?;
    let response = ctx.admin.upload_thumbnail_file(&file).await?;
    print_json(&response)
}

pub async fn sign_in(args: SignInArgs) -> Result<(), CliError> {
    let password = args.password.ok_or(CliError::MissingPassword)?;
    let auth = AuthClient::new(&args.provider_url, args.provider_key)?;
    let session = SessionHandle::new();
    let token = auth.sign_in(&session, &args.email, &password).await?;
    println!("{token}");
    Ok(())
}

fn post_form(fields: PostFields) -> Result<PostForm, CliError> {
    let content = match (fields.content, fields.content_file) {
        (_, Some(path)) => fs::read_to_string(&path).map_err(|source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        })?,
        (Some(content), None) => content,
        (None, None) => {
            return Err(CliError::InvalidInput(
                "--content or --content-file is required".into(),
            ));
        }
    };

    let mut form = PostForm {
        title: fields.title,
        content,
        ..Default::default()
    };
    form.set_thumbnail(fields.thumbnail_key);
    for id in fields.categories {
        if !form.category_ids.contains(&id) {
            form.toggle_category(id);
        }
    }
    Ok(form)
}
