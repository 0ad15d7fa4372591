use std::{process, sync::Arc};

use pressroom::{
    application::{
        articles::{ArticleService, CreateArticleCommand},
        error::{AppError, ServiceError},
        pagination::PageWindow,
        repos::{
            ArticleFilter, ArticleQuery, ArticlesRepo, ArticlesWriteRepo, TagFilter, TagQuery,
            TagsRepo, TagsWriteRepo,
        },
        tags::{CreateTagCommand, TagService},
        transfer,
    },
    cache::{self, CacheAside, CacheConfig},
    config::{self, ArticlesCommand, Command, TagsCommand},
    domain::{
        patch::{ArticlePatch, TagPatch, id_from_sentinel, state_from_sentinel, text_from_sentinel},
        types::RecordState,
    },
    infra::{db::PostgresRepositories, error::InfraError, telemetry},
};
use serde::Serialize;
use serde_json::json;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::validation(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Command::Migrate => run_migrate(&settings).await,
        Command::Articles(command) => {
            let services = build_services(&settings).await?;
            run_articles(&services.articles, &settings, command).await
        }
        Command::Tags(command) => {
            let services = build_services(&settings).await?;
            run_tags(&services.tags, &settings, command).await
        }
    }
}

async fn run_migrate(settings: &config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::Migration(err.to_string())))?;
    info!("Migrations applied");
    print_json(&json!({ "migrated": true }))
}

struct Services {
    articles: ArticleService,
    tags: TagService,
}

async fn build_services(settings: &config::Settings) -> Result<Services, AppError> {
    let repositories = init_repositories(settings).await?;

    let cache_config = CacheConfig::from(&settings.cache);
    let store = cache::build_store(&cache_config).await;
    let cache = CacheAside::from_config(store, &cache_config);

    let articles_repo: Arc<dyn ArticlesRepo> = repositories.clone();
    let articles_write_repo: Arc<dyn ArticlesWriteRepo> = repositories.clone();
    let tags_repo: Arc<dyn TagsRepo> = repositories.clone();
    let tags_write_repo: Arc<dyn TagsWriteRepo> = repositories;

    Ok(Services {
        articles: ArticleService::new(
            articles_repo,
            articles_write_repo,
            tags_repo.clone(),
            cache.clone(),
        ),
        tags: TagService::new(tags_repo, tags_write_repo, cache),
    })
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_articles(
    service: &ArticleService,
    settings: &config::Settings,
    command: ArticlesCommand,
) -> Result<(), AppError> {
    match command {
        ArticlesCommand::List(args) => {
            let filter = article_filter(&args.filter)?;
            let query = ArticleQuery {
                filter,
                page: page_window(&args.page, settings),
            };
            print_json(&service.list(&query).await?)
        }
        ArticlesCommand::Get(args) => print_json(&service.get_by_id(args.id).await?),
        ArticlesCommand::Add(args) => {
            let article = service
                .add(CreateArticleCommand {
                    tag_id: args.tag_id,
                    title: args.title,
                    description: args.description,
                    content: args.content,
                    cover_image_url: args.cover_image_url,
                    state: parse_state(args.state)?,
                    created_by: args.created_by,
                })
                .await?;
            print_json(&article)
        }
        ArticlesCommand::Edit(args) => {
            let patch = ArticlePatch {
                tag_id: id_from_sentinel(args.tag_id),
                title: text_from_sentinel(&args.title),
                description: text_from_sentinel(&args.description),
                content: text_from_sentinel(&args.content),
                cover_image_url: text_from_sentinel(&args.cover_image_url),
                state: state_from_sentinel(args.state).map_err(ServiceError::from)?,
                modified_by: Some(args.modified_by),
            };
            print_json(&service.edit(args.id, patch).await?)
        }
        ArticlesCommand::Delete(args) => {
            service.delete(args.id).await?;
            print_json(&json!({ "deleted": args.id }))
        }
        ArticlesCommand::Exists(args) => {
            let exists = service.exists_by_id(args.id).await?;
            print_json(&json!({ "exists": exists }))
        }
        ArticlesCommand::Count(args) => {
            let count = service.count(&article_filter(&args)?).await?;
            print_json(&json!({ "count": count }))
        }
    }
}

async fn run_tags(
    service: &TagService,
    settings: &config::Settings,
    command: TagsCommand,
) -> Result<(), AppError> {
    match command {
        TagsCommand::List(args) => {
            let query = TagQuery {
                filter: tag_filter(&args.filter)?,
                page: page_window(&args.page, settings),
            };
            print_json(&service.list(&query).await?)
        }
        TagsCommand::Get(args) => print_json(&service.get_by_id(args.id).await?),
        TagsCommand::Add(args) => {
            let tag = service
                .add(CreateTagCommand {
                    name: args.name,
                    state: parse_state(args.state)?,
                    created_by: args.created_by,
                })
                .await?;
            print_json(&tag)
        }
        TagsCommand::Edit(args) => {
            let patch = TagPatch {
                name: text_from_sentinel(&args.name),
                state: state_from_sentinel(args.state).map_err(ServiceError::from)?,
                modified_by: Some(args.modified_by),
            };
            print_json(&service.edit(args.id, patch).await?)
        }
        TagsCommand::Delete(args) => {
            service.delete(args.id).await?;
            print_json(&json!({ "deleted": args.id }))
        }
        TagsCommand::Exists(args) => {
            // The selector group makes `--name` present whenever `--id` is not.
            let exists = match args.id {
                Some(id) => service.exists_by_id(id).await?,
                None => {
                    service
                        .exists_by_name(args.name.as_deref().unwrap_or_default())
                        .await?
                }
            };
            print_json(&json!({ "exists": exists }))
        }
        TagsCommand::Count(args) => {
            let count = service.count(&tag_filter(&args)?).await?;
            print_json(&json!({ "count": count }))
        }
        TagsCommand::Export(args) => {
            let query = TagQuery {
                filter: tag_filter(&args.filter)?,
                page: PageWindow::unbounded(),
            };
            let exported = transfer::export_tags(service, &query, &args.file).await?;
            print_json(&json!({ "exported": exported, "path": args.file }))
        }
        TagsCommand::Import(args) => {
            let report = transfer::import_tags(service, &args.file, &args.actor).await?;
            print_json(&report)
        }
    }
}

fn page_window(args: &config::PageArgs, settings: &config::Settings) -> PageWindow {
    let page_size = args.page_size.unwrap_or(settings.app.page_size.get());
    PageWindow::new(args.page_num, page_size)
}

fn article_filter(args: &config::ArticleFilterArgs) -> Result<ArticleFilter, AppError> {
    Ok(ArticleFilter {
        tag_id: args.tag_id,
        state: args.state.map(parse_state).transpose()?,
    })
}

fn tag_filter(args: &config::TagFilterArgs) -> Result<TagFilter, AppError> {
    Ok(TagFilter {
        name: args.name.clone(),
        state: args.state.map(parse_state).transpose()?,
    })
}

fn parse_state(value: i16) -> Result<RecordState, AppError> {
    RecordState::try_from(value)
        .map_err(ServiceError::from)
        .map_err(AppError::from)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
