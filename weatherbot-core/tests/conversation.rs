use async_trait::async_trait;
use serde_json::json;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use weatherbot_core::{
    AgentExecutor, AssistantReply, ChatModel, Message, Prompter, Session, ToolCall, ToolRegistry,
    ToolSpec, WeatherSettings, WeatherTool, provider::openweather::OpenWeatherProvider,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

/// Asks for London's weather, then answers with whatever the tool returned.
#[derive(Debug, Default)]
struct WeatherQuestionModel {
    seen_tools: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatModel for WeatherQuestionModel {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> anyhow::Result<AssistantReply> {
        self.seen_tools.lock().unwrap().extend(tools.iter().map(|t| t.name.clone()));

        match messages.last() {
            Some(Message::Tool { content, .. }) => {
                Ok(AssistantReply::text(format!("Here is what I found.\n{content}")))
            }
            _ => Ok(AssistantReply::tool_calls(vec![ToolCall::function(
                "call_1",
                "get_current_weather",
                r#"{"city":"London"}"#,
            )])),
        }
    }
}

struct Lines(VecDeque<String>);

impl Prompter for Lines {
    fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        Ok(self.0.pop_front())
    }
}

#[tokio::test]
async fn weather_question_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "London"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cod": 200,
            "name": "London",
            "sys": { "country": "GB" },
            "main": { "temp": 15.2, "feels_like": 14.8, "humidity": 70 },
            "weather": [{ "description": "light rain" }],
            "wind": { "speed": 3.5 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenWeatherProvider::new(&WeatherSettings::new(Some("KEY".into()), server.uri())).unwrap();
    let tools = ToolRegistry::new().with_tool(WeatherTool::new(Arc::new(provider)));
    let model = Arc::new(WeatherQuestionModel::default());
    let agent = AgentExecutor::new(Box::new(SharedModel(model.clone())), tools);
    let mut session = Session::new(agent);

    let mut prompter = Lines(
        ["What's the weather in London?", "exit"].iter().map(|s| s.to_string()).collect(),
    );
    let mut out = Vec::new();
    session.run(&mut prompter, &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    let reply = out
        .lines()
        .skip_while(|l| !l.starts_with("Bot: "))
        .take_while(|l| *l != "Goodbye!")
        .collect::<Vec<_>>()
        .join("\n");
    assert!(reply.contains("15.2"), "{reply}");
    assert!(reply.contains("Light rain"), "{reply}");
    assert!(reply.contains("70%"), "{reply}");

    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history().turns()[0].text, "What's the weather in London?");
    assert!(
        model.seen_tools.lock().unwrap().iter().all(|name| name == "get_current_weather")
    );
}

/// Lets the test keep a handle on the model after the agent takes ownership.
#[derive(Debug)]
struct SharedModel(Arc<WeatherQuestionModel>);

#[async_trait]
impl ChatModel for SharedModel {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> anyhow::Result<AssistantReply> {
        self.0.complete(messages, tools).await
    }
}
