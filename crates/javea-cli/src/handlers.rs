#![deny(clippy::all, clippy::pedantic)]

use javea_api_types::{
    HEALTH_PATH, REVALIDATE_PATH, REVALIDATE_SECRET_HEADER, RevalidateRequest, RevalidateResponse,
};

use crate::args::RevalidateArgs;
use crate::client::{CliError, Ctx};
use crate::print::print_json;

/// Flags left empty stay absent from the body, so a bare `revalidate`
/// asks the server for a full invalidation.
pub fn build_request(args: RevalidateArgs) -> RevalidateRequest {
    RevalidateRequest {
        tags: (!args.tags.is_empty()).then_some(args.tags),
        paths: (!args.paths.is_empty()).then_some(args.paths),
        clear_all: args.all.then_some(true),
    }
}

pub async fn revalidate(ctx: &Ctx, args: RevalidateArgs) -> Result<RevalidateResponse, CliError> {
    let resp = ctx
        .client
        .post(ctx.url(REVALIDATE_PATH)?)
        .header(REVALIDATE_SECRET_HEADER, ctx.secret()?)
        .json(&build_request(args))
        .send()
        .await?;
    Ctx::handle(resp).await
}

pub async fn handle_revalidate(ctx: &Ctx, args: RevalidateArgs) -> Result<(), CliError> {
    let response = revalidate(ctx, args).await?;
    print_json(&response)
}

pub async fn handle_health(ctx: &Ctx) -> Result<(), CliError> {
    let resp = ctx.client.get(ctx.url(HEALTH_PATH)?).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(CliError::Server(format!("health check returned {status}")));
    }
    println!("ok ({status})");
    Ok(())
}
