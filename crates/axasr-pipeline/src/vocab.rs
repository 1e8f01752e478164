//! Словарь токенов.
//!
//! Формат `{model_type}-tokens.txt`: по одной записи `<токен> <id>` на строку
//! (id — последнее поле, сам токен может содержать пробелы). Субворды
//! помечаются sentencepiece-маркером `▁` (U+2581), который при сборке текста
//! превращается в пробел.
//!
//! Декодирование детерминировано и не имеет скрытого состояния.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use axasr_core::{AsrError, AsrResult};

/// Маркер начала слова в sentencepiece-словарях.
const WORD_BOUNDARY: char = '\u{2581}';

/// Верхняя граница id токена: таблица аллоцируется по max id, поэтому
/// tokens.txt с диким id не должен превращаться в гигантскую аллокацию.
/// Реальные словари — десятки-сотни тысяч записей.
const MAX_TOKEN_ID: u32 = 4_000_000;

/// Словарь: отображение id ↔ текстовый фрагмент.
#[derive(Debug)]
pub struct Vocabulary {
    id_to_token: Vec<Option<String>>,
    token_to_id: HashMap<String, u32>,
    reserved_ids: HashSet<u32>,
}

impl Vocabulary {
    /// Загрузить словарь из tokens.txt.
    ///
    /// `reserved_ids` — служебные id из конфигурации модели (sot/eot/pad/unk);
    /// они никогда не попадают в собранный текст.
    pub fn load(path: impl AsRef<Path>, reserved_ids: &[u32]) -> AsrResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            AsrError::Tokenizer(format!("не удалось прочитать {}: {e}", path.display()))
        })?;

        let mut pairs: Vec<(String, u32)> = Vec::new();
        for (line_no, line) in data.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let Some(last_space) = line.rfind(' ') else {
                return Err(AsrError::Tokenizer(format!(
                    "{}:{}: строка без id",
                    path.display(),
                    line_no + 1
                )));
            };
            let token = &line[..last_space];
            let id: u32 = line[last_space + 1..].parse().map_err(|_| {
                AsrError::Tokenizer(format!(
                    "{}:{}: некорректный id \"{}\"",
                    path.display(),
                    line_no + 1,
                    &line[last_space + 1..]
                ))
            })?;
            if id > MAX_TOKEN_ID {
                return Err(AsrError::Tokenizer(format!(
                    "{}:{}: id {id} превышает лимит {MAX_TOKEN_ID}",
                    path.display(),
                    line_no + 1
                )));
            }
            pairs.push((token.to_string(), id));
        }

        if pairs.is_empty() {
            return Err(AsrError::Tokenizer(format!(
                "{}: пустой словарь",
                path.display()
            )));
        }

        let max_id = pairs.iter().map(|(_, id)| *id).max().unwrap_or(0);
        let mut id_to_token: Vec<Option<String>> = vec![None; (max_id as usize) + 1];
        let mut token_to_id = HashMap::with_capacity(pairs.len());

        for (token, id) in pairs {
            // Дубликаты id — ошибка формата, а не тихое переопределение.
            if id_to_token[id as usize].is_some() {
                return Err(AsrError::Tokenizer(format!(
                    "{}: повторяющийся id {id}",
                    path.display()
                )));
            }
            token_to_id.entry(token.clone()).or_insert(id);
            id_to_token[id as usize] = Some(token);
        }

        Ok(Self {
            id_to_token,
            token_to_id,
            reserved_ids: reserved_ids.iter().copied().collect(),
        })
    }

    /// Количество известных id (включая дыры в нумерации).
    pub fn size(&self) -> usize {
        self.id_to_token.len()
    }

    /// Вернуть id токена по строковому представлению.
    pub fn token_id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Токен языка вида `<|en|>`, если есть в словаре.
    pub fn language_token(&self, code: &str) -> Option<u32> {
        self.token_id(&format!("<|{code}|>"))
    }

    /// `true` для служебных id и токенов-маркеров вида `<|...|>`.
    pub fn is_control(&self, id: u32) -> bool {
        if self.reserved_ids.contains(&id) {
            return true;
        }
        match self.id_to_token.get(id as usize).and_then(|t| t.as_ref()) {
            Some(t) => t.starts_with("<|") && t.ends_with("|>"),
            None => false,
        }
    }

    /// Собрать текст из последовательности токенов.
    ///
    /// Служебные id и маркеры пропускаются, `▁` превращается в пробел,
    /// края обрезаются.
    pub fn decode(&self, token_ids: &[u32]) -> String {
        let mut raw = String::new();
        for &id in token_ids {
            if self.is_control(id) {
                continue;
            }
            if let Some(tok) = self.id_to_token.get(id as usize).and_then(|t| t.as_ref()) {
                raw.push_str(tok);
            }
        }
        raw.replace(WORD_BOUNDARY, " ").trim().to_string()
    }
}
