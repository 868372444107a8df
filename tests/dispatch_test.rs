//! End-to-end dispatch pipeline tests driven through the harness backend
//! Run with: cargo test --test dispatch_test

use std::sync::Arc;

use relaybot::application::errors::HandlerError;
use relaybot::application::messaging::{ArgParser, MSG_ACCESS_DENIED, MSG_ERROR_OCCURRED};
use relaybot::application::services::BotService;
use relaybot::domain::entities::{
    CommandDescriptor, CommandOutput, FnHandler, Identifier, Message, ReplyItem,
};
use relaybot::domain::traits::EventHandler;
use relaybot::infrastructure::adapters::HarnessAdapter;
use relaybot::infrastructure::config::Config;

const LONG_TEXT: &str =
    "This is a relatively long line of output, but I am repeated multiple times.\n";

fn test_config() -> Config {
    let mut config = Config::default();
    config.bot.identity = "bot@localhost/bot".to_string();
    config.bot.display_name = "bot".to_string();
    config.bot.prefix = "!".to_string();
    config.admins = vec!["admin@localhost".to_string()];
    config.rooms.presence.clear();
    config.rooms.keepalive_seconds = 0;
    config
}

fn setup(config: &Config) -> (Arc<HarnessAdapter>, BotService) {
    let harness = HarnessAdapter::new();
    let bot = BotService::from_config(config, harness.clone()).expect("bot builds");
    (harness, bot)
}

fn sender() -> Identifier {
    Identifier::parse("noterr@localhost/resource").unwrap()
}

fn inbound(bot: &BotService, body: &str) -> Message {
    Message::new(sender(), bot.identity().clone(), body)
}

fn text_command<F>(name: &str, f: F) -> CommandDescriptor
where
    F: Fn(&Message, Vec<String>) -> Result<CommandOutput, HandlerError> + Send + Sync + 'static,
{
    CommandDescriptor::new(name, Arc::new(FnHandler(f))).with_owner("test")
}

#[tokio::test]
async fn command_returning_string_sends_exactly_one_message() {
    let config = test_config();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(text_command(
        "return_args_as_str",
        |_msg, args| Ok(CommandOutput::text(args.concat())),
    ));

    bot.callback_message(inbound(&bot, "!return_args_as_str foo bar"))
        .await;

    let reply = harness.pop_message().expect("one reply");
    assert_eq!(reply.body, "foobar");
    assert_eq!(reply.to.to_string(), "noterr@localhost");
    assert_eq!(reply.from.to_string(), "bot@localhost/bot");
    assert_eq!(harness.pending_messages(), 0);
}

#[tokio::test]
async fn unknown_command_gets_a_not_found_reply() {
    let config = test_config();
    let (harness, bot) = setup(&config);

    bot.callback_message(inbound(&bot, "!nosuchthing at all")).await;

    let reply = harness.pop_message().expect("one reply");
    assert!(reply.body.contains("Command not found"));
    assert!(reply.body.contains("nosuchthing"));
    assert_eq!(harness.pending_messages(), 0);
}

#[tokio::test]
async fn handler_failure_is_isolated_to_one_error_reply() {
    let config = test_config();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(text_command(
        "raises",
        |_msg, _args| Err(HandlerError::new("Kaboom!")),
    ));

    bot.callback_message(inbound(&bot, "!raises")).await;

    let reply = harness.pop_message().expect("one reply");
    assert!(reply.body.contains(MSG_ERROR_OCCURRED));
    assert!(reply.body.contains("Kaboom!"));
    assert_eq!(harness.pending_messages(), 0);

    // The pipeline is still alive afterwards.
    bot.callback_message(inbound(&bot, "!room list")).await;
    assert!(harness.pop_message().is_some());
}

#[tokio::test]
async fn yielded_items_become_separate_messages() {
    let config = test_config();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(text_command(
        "yields",
        |_msg, args| {
            Ok(CommandOutput::stream(
                args.into_iter().map(|a| Ok(ReplyItem::Text(a))),
            ))
        },
    ));

    bot.callback_message(inbound(&bot, "!yields foo bar")).await;

    assert_eq!(harness.pop_message().unwrap().body, "foo");
    assert_eq!(harness.pop_message().unwrap().body, "bar");
    assert_eq!(harness.pending_messages(), 0);
}

#[tokio::test]
async fn partial_output_before_mid_sequence_failure_is_preserved() {
    let config = test_config();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(text_command(
        "yields_then_raises",
        |_msg, _args| {
            let items = vec![
                Ok(ReplyItem::Text("foobar".to_string())),
                Err(HandlerError::new("Kaboom!")),
            ];
            Ok(CommandOutput::stream(items.into_iter()))
        },
    ));

    bot.callback_message(inbound(&bot, "!yields_then_raises")).await;

    assert_eq!(harness.pop_message().unwrap().body, "foobar");
    let error = harness.pop_message().expect("synthetic error reply");
    assert!(error.body.contains(MSG_ERROR_OCCURRED));
    assert_eq!(harness.pending_messages(), 0);
}

#[tokio::test]
async fn immediate_stream_failure_sends_only_the_error_reply() {
    let config = test_config();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(text_command(
        "raises_immediately",
        |_msg, _args| {
            let items: Vec<Result<ReplyItem, HandlerError>> =
                vec![Err(HandlerError::new("Kaboom!"))];
            Ok(CommandOutput::stream(items.into_iter()))
        },
    ));

    bot.callback_message(inbound(&bot, "!raises_immediately")).await;

    let error = harness.pop_message().expect("synthetic error reply");
    assert!(error.body.contains(MSG_ERROR_OCCURRED));
    assert_eq!(harness.pending_messages(), 0);
}

#[tokio::test]
async fn long_output_is_split_into_size_limited_messages() {
    let mut config = test_config();
    config.bot.message_size_limit = LONG_TEXT.chars().count();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(text_command(
        "return_long_output",
        |_msg, _args| Ok(CommandOutput::text(LONG_TEXT.repeat(3))),
    ));

    bot.callback_message(inbound(&bot, "!return_long_output")).await;

    let limit = LONG_TEXT.chars().count();
    let mut chunks = Vec::new();
    while let Some(reply) = harness.pop_message() {
        assert!(reply.body.chars().count() <= limit);
        assert_eq!(reply.to.to_string(), "noterr@localhost");
        chunks.push(reply.body);
    }
    assert_eq!(chunks.len(), 3);
    // Splits landed on the newline boundaries, which the cut consumes.
    assert_eq!(chunks.join("\n"), LONG_TEXT.repeat(3));
}

#[tokio::test]
async fn unsplittable_long_output_hard_splits_into_three() {
    let mut config = test_config();
    config.bot.message_size_limit = 10;
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(text_command(
        "dense",
        |_msg, _args| Ok(CommandOutput::text("x".repeat(30))),
    ));

    bot.callback_message(inbound(&bot, "!dense")).await;

    let mut rebuilt = String::new();
    let mut count = 0;
    while let Some(reply) = harness.pop_message() {
        assert!(reply.body.chars().count() <= 10);
        rebuilt.push_str(&reply.body);
        count += 1;
    }
    assert_eq!(count, 3);
    assert_eq!(rebuilt, "x".repeat(30));
}

#[tokio::test]
async fn every_yielded_item_is_chunked_independently() {
    let mut config = test_config();
    config.bot.message_size_limit = LONG_TEXT.chars().count();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(text_command(
        "yield_long_output",
        |_msg, _args| {
            let items = (0..2).map(|_| Ok(ReplyItem::Text(LONG_TEXT.repeat(3))));
            Ok(CommandOutput::stream(items))
        },
    ));

    bot.callback_message(inbound(&bot, "!yield_long_output")).await;

    let mut count = 0;
    while harness.pop_message().is_some() {
        count += 1;
    }
    assert_eq!(count, 6);
}

#[tokio::test]
async fn argument_syntax_error_is_a_visible_reply() {
    let config = test_config();
    let (harness, bot) = setup(&config);

    bot.callback_message(inbound(&bot, "!room occupants \"never closed"))
        .await;

    let reply = harness.pop_message().expect("one reply");
    assert!(reply.body.contains("Invalid arguments"));
    assert!(reply.body.contains("unbalanced quote"));
    assert_eq!(harness.pending_messages(), 0);
}

#[tokio::test]
async fn shell_parser_feeds_quoted_arguments_to_handlers() {
    let config = test_config();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(
        text_command("quoted", |_msg, args| {
            Ok(CommandOutput::text(args.join("|")))
        })
        .with_parser(ArgParser::Shell),
    );

    bot.callback_message(inbound(&bot, "!quoted one \"two three\" four"))
        .await;

    assert_eq!(harness.pop_message().unwrap().body, "one|two three|four");
}

#[tokio::test]
async fn compound_token_reaches_the_underscore_command() {
    let config = test_config();
    let (harness, bot) = setup(&config);

    bot.callback_message(inbound(&bot, "!room list")).await;
    let via_compound = harness.pop_message().expect("reply").body;

    bot.callback_message(inbound(&bot, "!room_list")).await;
    let via_exact = harness.pop_message().expect("reply").body;

    assert_eq!(via_compound, "I'm not currently in any rooms.");
    assert_eq!(via_compound, via_exact);
}

#[tokio::test]
async fn reregistered_command_wins() {
    let config = test_config();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(text_command(
        "dup",
        |_msg, _args| Ok(CommandOutput::text("first")),
    ));
    bot.registry().write().unwrap().register(text_command(
        "dup",
        |_msg, _args| Ok(CommandOutput::text("second")),
    ));

    bot.callback_message(inbound(&bot, "!dup")).await;

    assert_eq!(harness.pop_message().unwrap().body, "second");
}

#[tokio::test]
async fn admin_command_is_gated_on_the_admin_list() {
    let config = test_config();
    let (harness, bot) = setup(&config);
    bot.registry().write().unwrap().register(
        text_command("secret", |_msg, _args| Ok(CommandOutput::text("granted")))
            .admin_only(),
    );

    bot.callback_message(inbound(&bot, "!secret")).await;
    assert_eq!(harness.pop_message().unwrap().body, MSG_ACCESS_DENIED);

    let admin = Identifier::parse("admin@localhost/home").unwrap();
    bot.callback_message(Message::new(admin, bot.identity().clone(), "!secret"))
        .await;
    assert_eq!(harness.pop_message().unwrap().body, "granted");
}

#[tokio::test]
async fn structured_output_renders_through_the_template() {
    let config = test_config();
    let (harness, bot) = setup(&config);

    bot.callback_message(inbound(&bot, "!about")).await;

    let reply = harness.pop_message().expect("one reply");
    assert_eq!(reply.body, "relaybot version 0.1.0");
    assert!(reply.rich_body.as_deref().unwrap().contains("<strong>"));
}

#[tokio::test]
async fn help_lists_registered_commands() {
    let config = test_config();
    let (harness, bot) = setup(&config);

    bot.callback_message(inbound(&bot, "!help")).await;
    let listing = harness.pop_message().expect("reply").body;
    assert!(listing.contains("room_create"));
    assert!(listing.contains("about"));

    bot.callback_message(inbound(&bot, "!help room_join")).await;
    let single = harness.pop_message().expect("reply").body;
    assert!(single.contains("room_join"));
    assert!(single.contains("Join a chatroom"));
}

#[tokio::test]
async fn delivery_failure_does_not_kill_the_pipeline() {
    let config = test_config();
    let (harness, bot) = setup(&config);
    harness.fail_sends_to("noterr@localhost");

    bot.callback_message(inbound(&bot, "!room list")).await;
    assert_eq!(harness.pending_messages(), 0);

    // A different sender still gets served.
    let other = Identifier::parse("other@localhost/x").unwrap();
    bot.callback_message(Message::new(other, bot.identity().clone(), "!room list"))
        .await;
    assert!(harness.pop_message().is_some());
}

#[tokio::test]
async fn non_command_messages_produce_no_replies() {
    let config = test_config();
    let (harness, bot) = setup(&config);

    bot.callback_message(inbound(&bot, "just chatting")).await;

    assert_eq!(harness.pending_messages(), 0);
}

#[tokio::test]
async fn unregister_all_deactivates_an_owner() {
    let config = test_config();
    let (harness, bot) = setup(&config);

    let removed = bot.registry().write().unwrap().unregister_all("chatroom");
    assert!(removed >= 8);

    bot.callback_message(inbound(&bot, "!room list")).await;
    let reply = harness.pop_message().expect("reply");
    assert!(reply.body.contains("Command not found"));
}
