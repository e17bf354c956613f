use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use prompt_budget::{
    ChatMessage, ShortenRequest, Tokenizer, TokenizerFamily, ToolDefinition,
    count_tokens_for_message, count_tokens_for_system_and_tools, shorten_past_messages,
};
use serde_json::json;

// Helper to create a conversation of alternating turns
fn create_history(count: usize, text_size: usize) -> Vec<ChatMessage> {
    let text = "a".repeat(text_size);
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                ChatMessage::user(&text)
            } else {
                ChatMessage::assistant(&text)
            }
        })
        .collect()
}

fn search_tool() -> ToolDefinition {
    ToolDefinition::function(
        "search_sources",
        "Retrieve relevant passages from the search index",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Free-text search query"},
                "top": {"type": "integer"},
            },
            "required": ["query"],
        }),
    )
}

// Benchmark: counting a single message at varying content sizes
fn bench_count_message_by_size(c: &mut Criterion) {
    let tokenizer = Tokenizer::resolve("gpt-4", TokenizerFamily::Bpe, false).unwrap();
    let mut group = c.benchmark_group("count_message_by_size");

    for size in [64, 512, 4096] {
        let message = ChatMessage::user("a".repeat(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &message, |b, message| {
            b.iter(|| count_tokens_for_message(black_box(message), &tokenizer).unwrap());
        });
    }

    group.finish();
}

// Benchmark: the system/tools accountant, with and without tools
fn bench_system_and_tools(c: &mut Criterion) {
    let tokenizer = Tokenizer::resolve("gpt-4", TokenizerFamily::Bpe, false).unwrap();
    let system = ChatMessage::system("You answer questions about the employee handbook.");
    let tools = vec![search_tool()];

    c.bench_function("system_only", |b| {
        b.iter(|| {
            count_tokens_for_system_and_tools(black_box(Some(&system)), None, None, &tokenizer)
                .unwrap()
        });
    });

    c.bench_function("system_and_tools", |b| {
        b.iter(|| {
            count_tokens_for_system_and_tools(
                black_box(Some(&system)),
                Some(tools.as_slice()),
                None,
                &tokenizer,
            )
            .unwrap()
        });
    });
}

// Benchmark: the full shortening walk at varying history lengths
fn bench_shorten_by_history_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("shorten_by_history_length");

    for count in [10, 50, 200] {
        let request = ShortenRequest::builder()
            .model("gpt-4")
            .family(TokenizerFamily::Bpe)
            .system_message("You answer questions about the employee handbook.")
            .max_tokens(2048)
            .new_user_content("Summarize the differences between the plans.")
            .past_messages(create_history(count, 200))
            .build()
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(count), &request, |b, request| {
            b.iter(|| shorten_past_messages(black_box(request)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_count_message_by_size,
    bench_system_and_tools,
    bench_shorten_by_history_length
);
criterion_main!(benches);
