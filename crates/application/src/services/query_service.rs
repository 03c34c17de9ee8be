//! Query agent over stored receipts
//!
//! Answers free-form questions by running a bounded tool-calling loop
//! against the inference backend. The tools execute aggregate queries over
//! the requesting user's receipts only.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use domain::{User, UserId};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{
    AgentTurn, DateRange, InferencePort, MessengerPort, ReceiptStore, ToolInvocation, ToolOutcome,
    ToolSpec,
};
use crate::receipt_fields::format_receipt_date;

/// Upper bound on agent rounds before giving up
const MAX_AGENT_ROUNDS: usize = 6;

/// Reply when the agent finished without producing an answer
pub const FALLBACK_REPLY: &str = "Sorry I was not able to solve your query, can you try again";

/// Reply when the agent errored out
pub const GUIDANCE_REPLY: &str = "I encountered an error while processing your query. Here are some tips:\n\
     1. Try rephrasing your question.\n\
     2. Make sure you're asking about receipt data (date, vendor, total amount).\n\
     3. If you're looking for specific calculations, be clear about what you need.";

/// Service answering natural-language questions over receipts
pub struct QueryService {
    inference: Arc<dyn InferencePort>,
    receipts: Arc<dyn ReceiptStore>,
    messenger: Arc<dyn MessengerPort>,
}

impl fmt::Debug for QueryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryService").finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
struct StatsArgs {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VendorArgs {
    top_n: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ListArgs {
    search: Option<String>,
    limit: Option<u32>,
}

impl QueryService {
    /// Create a new query service
    pub fn new(
        inference: Arc<dyn InferencePort>,
        receipts: Arc<dyn ReceiptStore>,
        messenger: Arc<dyn MessengerPort>,
    ) -> Self {
        Self {
            inference,
            receipts,
            messenger,
        }
    }

    /// Answer a question and send the reply to the user
    #[instrument(skip(self, user, question), fields(user_id = %user.id(), question_len = question.len()))]
    pub async fn handle_question(&self, user: &User, question: &str) {
        let answer = self.answer(user.id(), question).await;
        if let Err(e) = self.messenger.send_text(user.phone_number(), &answer).await {
            warn!(error = %e, "Failed to send query reply");
        }
    }

    /// Run the agent loop and return the textual answer
    ///
    /// Never fails: agent errors surface as the guidance reply, an empty
    /// answer as the fallback reply.
    #[instrument(skip(self, question), fields(user_id = %user_id))]
    pub async fn answer(&self, user_id: UserId, question: &str) -> String {
        match self.run_agent(user_id, question).await {
            Ok(text) if text.trim().is_empty() => FALLBACK_REPLY.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Query agent failed");
                GUIDANCE_REPLY.to_string()
            },
        }
    }

    async fn run_agent(
        &self,
        user_id: UserId,
        question: &str,
    ) -> Result<String, ApplicationError> {
        let tools = tool_specs();
        let system = system_prompt();
        let mut turns = vec![AgentTurn::User(question.to_string())];
        let mut final_text = String::new();

        for round in 0..MAX_AGENT_ROUNDS {
            debug!(round, "Agent round");
            let completion = self
                .inference
                .complete_agent(&system, &turns, &tools)
                .await?;

            if !completion.text.is_empty() {
                final_text.push_str(&completion.text);
            }

            if completion.calls.is_empty() {
                info!(round, "Agent done (no more tool calls)");
                break;
            }

            let calls = completion.calls.clone();
            turns.push(AgentTurn::Assistant {
                text: completion.text,
                calls: completion.calls,
            });

            let mut outcomes = Vec::with_capacity(calls.len());
            for call in calls {
                debug!(tool = %call.name, "Tool call");
                let content = match self.run_tool(user_id, &call).await {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool error");
                        serde_json::json!({"error": e.to_string()})
                    },
                };
                outcomes.push(ToolOutcome {
                    name: call.name,
                    content,
                });
            }
            turns.push(AgentTurn::ToolResults(outcomes));
        }

        Ok(final_text)
    }

    async fn run_tool(
        &self,
        user_id: UserId,
        call: &ToolInvocation,
    ) -> Result<serde_json::Value, ApplicationError> {
        match call.name.as_str() {
            "receipt_stats" => {
                let args: StatsArgs = parse_args(&call.arguments)?;
                let range = DateRange {
                    from: args.from.as_deref().map(parse_iso_date).transpose()?,
                    to: args.to.as_deref().map(parse_iso_date).transpose()?,
                };
                let stats = self.receipts.stats_for_user(&user_id, range).await?;
                Ok(serde_json::json!({
                    "count": stats.count,
                    "total": stats.total.to_string(),
                    "average": stats.average.map(|a| a.to_string()),
                    "min": stats.min.map(|a| a.to_string()),
                    "max": stats.max.map(|a| a.to_string()),
                    "first_date": stats.first_date.map(|d| d.to_string()),
                    "last_date": stats.last_date.map(|d| d.to_string()),
                }))
            },
            "spend_by_vendor" => {
                let args: VendorArgs = parse_args(&call.arguments)?;
                let rows = self.receipts.spend_by_vendor(&user_id, args.top_n).await?;
                let vendors: Vec<serde_json::Value> = rows
                    .iter()
                    .map(|row| {
                        serde_json::json!({
                            "vendor": row.vendor,
                            "total": row.total.to_string(),
                            "count": row.count,
                        })
                    })
                    .collect();
                Ok(serde_json::json!({"vendors": vendors}))
            },
            "spend_by_date" => {
                let rows = self.receipts.spend_by_date(&user_id).await?;
                let dates: Vec<serde_json::Value> = rows
                    .iter()
                    .map(|row| {
                        serde_json::json!({
                            "date": row.date.to_string(),
                            "total": row.total.to_string(),
                        })
                    })
                    .collect();
                Ok(serde_json::json!({"dates": dates}))
            },
            "list_receipts" => {
                let args: ListArgs = parse_args(&call.arguments)?;
                let receipts = self
                    .receipts
                    .list_for_user(&user_id, args.search.as_deref(), args.limit)
                    .await?;
                let rows: Vec<serde_json::Value> = receipts
                    .iter()
                    .map(|receipt| {
                        serde_json::json!({
                            "date": receipt.date().map(format_receipt_date),
                            "vendor": receipt.vendor(),
                            "total_amount": receipt.amount().to_string(),
                        })
                    })
                    .collect();
                Ok(serde_json::json!({"receipts": rows}))
            },
            other => Err(ApplicationError::Internal(format!("unknown tool: {other}"))),
        }
    }
}

fn parse_args<T: Default + for<'de> Deserialize<'de>>(
    arguments: &serde_json::Value,
) -> Result<T, ApplicationError> {
    if arguments.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(arguments.clone())
        .map_err(|e| ApplicationError::Internal(format!("invalid tool arguments: {e}")))
}

fn parse_iso_date(input: &str) -> Result<NaiveDate, ApplicationError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| domain::DomainError::InvalidDate(format!("expected YYYY-MM-DD: {input}")).into())
}

/// The system prompt describing the table and the task
fn system_prompt() -> String {
    "You are an AI assistant analyzing receipt data for a user. The data is the \
     user's logged receipts with columns: date, vendor, and total_amount.\n\
     \n\
     To answer a query:\n\
     1. Use the available tools to compute totals, find patterns, or list receipts.\n\
     2. Provide a detailed response based on the tool results.\n\
     3. Present the results in a clear, user-friendly format."
        .to_string()
}

/// Tool specifications offered to the model
fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "receipt_stats".to_string(),
            description:
                "Count, total, average, min/max amount and date range of the user's receipts, \
                 with optional from/to date filters."
                    .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "from": {"type": "string", "description": "Start date (YYYY-MM-DD), inclusive"},
                    "to": {"type": "string", "description": "End date (YYYY-MM-DD), inclusive"}
                }
            }),
        },
        ToolSpec {
            name: "spend_by_vendor".to_string(),
            description: "Total spending grouped by vendor, largest first, with optional top_n."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "top_n": {"type": "integer", "description": "Limit to the top N vendors"}
                }
            }),
        },
        ToolSpec {
            name: "spend_by_date".to_string(),
            description: "Total spending per receipt date, chronological.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSpec {
            name: "list_receipts".to_string(),
            description:
                "List individual receipts with date, vendor, and total amount. Supports a \
                 vendor search term and a row limit."
                    .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "search": {"type": "string", "description": "Substring to match against vendor names"},
                    "limit": {"type": "integer", "description": "Maximum number of rows"}
                }
            }),
        },
    ]
}
