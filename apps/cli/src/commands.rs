use std::collections::HashSet;

use anyhow::Context;
use serde::Serialize;

use habitbuddy_core::goals::Goal;
use habitbuddy_core::matches::{AggregationResult, DisplayName, EnrichedGoalMatch, RefreshOutcome};
use habitbuddy_core::session::{AccountCreated, Credentials, Registration, SignedIn};

use crate::main_lib::AppState;

pub async fn login(state: &AppState, email: String, password: String) -> anyhow::Result<()> {
    let signed_in = state
        .session
        .login(Credentials { email, password })
        .await?;
    print_signed_in(&signed_in);
    Ok(())
}

pub async fn register(
    state: &AppState,
    name: String,
    email: String,
    password: String,
) -> anyhow::Result<()> {
    let created = state
        .session
        .register(Registration {
            name,
            email,
            password,
        })
        .await?;
    print_account_created(&created);
    Ok(())
}

pub fn logout(state: &AppState) -> anyhow::Result<()> {
    state.session.logout()?;
    println!("Signed out.");
    Ok(())
}

pub fn whoami(state: &AppState) -> anyhow::Result<()> {
    println!("{}", state.session.current_user_id()?);
    Ok(())
}

pub async fn matches(state: &AppState, json: bool) -> anyhow::Result<()> {
    let user_id = state.session.current_user_id()?;
    let result = match state.aggregator.refresh(&user_id).await? {
        RefreshOutcome::Published { result, .. } => result,
        RefreshOutcome::Stale {
            run_id,
            latest_run_id,
        } => anyhow::bail!("Run {run_id} was superseded by run {latest_run_id}"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&*result)?);
    } else {
        print!("{}", render_matches(&result));
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry<'a> {
    #[serde(flatten)]
    goal: &'a Goal,
    owned: bool,
}

pub async fn goals(state: &AppState, json: bool) -> anyhow::Result<()> {
    let owned = owned_goal_ids(state).await;
    state.workflow.mark_owned(owned.iter().cloned());
    state.workflow.open_catalog().await?;
    let catalog = state.workflow.catalog();

    if json {
        let entries: Vec<CatalogEntry<'_>> = catalog
            .iter()
            .map(|goal| CatalogEntry {
                goal,
                owned: owned.contains(&goal.id),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for goal in &catalog {
            let marker = if owned.contains(&goal.id) { "*" } else { " " };
            println!("{marker} {:<12} {}", goal.id, goal.name);
        }
        if !owned.is_empty() {
            println!("\n* already enrolled");
        }
    }
    Ok(())
}

pub async fn enroll(state: &AppState, goal_id: &str) -> anyhow::Result<()> {
    let user_id = state.session.current_user_id()?;
    let owned = owned_goal_ids(state).await;
    state.workflow.mark_owned(owned);

    state
        .workflow
        .open_catalog()
        .await
        .context("Could not load the goal catalog")?;
    state.workflow.select_goal(goal_id)?;
    let confirmation = state.workflow.submit(&user_id).await?;
    state.workflow.acknowledge()?;

    println!("{}", confirmation.message);
    Ok(())
}

/// Goals the signed-in user is enrolled in; empty when signed out or when the
/// match fetch fails. No name lookups are made.
async fn owned_goal_ids(state: &AppState) -> HashSet<String> {
    let Ok(user_id) = state.session.current_user_id() else {
        return HashSet::new();
    };
    match state.match_service.get_user_goal_matches(&user_id).await {
        Ok(matches) => matches.goal_ids(),
        Err(e) => {
            tracing::warn!("Could not load enrolled goals: {}", e);
            HashSet::new()
        }
    }
}

fn print_signed_in(signed_in: &SignedIn) {
    println!("{}", signed_in.message);
    println!("Signed in as {}", signed_in.user_id);
}

fn print_account_created(created: &AccountCreated) {
    println!("{}", created.message);
    match &created.user_id {
        Some(user_id) => println!("Signed in as {}", user_id),
        None => println!("Run `habitbuddy login` to sign in."),
    }
}

fn display(name: &DisplayName) -> &str {
    name.as_str().unwrap_or("(unavailable)")
}

fn render_line(item: &EnrichedGoalMatch) -> String {
    match &item.matched_with_name {
        Some(partner) => format!("  {}  with {}\n", display(&item.goal_name), display(partner)),
        None => format!("  {}\n", display(&item.goal_name)),
    }
}

pub(crate) fn render_matches(result: &AggregationResult) -> String {
    let mut out = String::from("Matched goals:\n");
    if result.matched.is_empty() {
        out.push_str("  (none)\n");
    }
    out.extend(result.matched.iter().map(render_line));

    out.push_str("Unmatched goals:\n");
    if result.unmatched.is_empty() {
        out.push_str("  (none)\n");
    }
    out.extend(result.unmatched.iter().map(render_line));
    out
}
