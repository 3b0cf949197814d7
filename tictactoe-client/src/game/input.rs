//! 用户意图

use protocol::Cell;

/// 来自界面的用户意图
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// 提交昵称并加入对局
    SubmitName { nickname: Option<String> },
    /// 点击格子
    CellClick(Cell),
    /// 对"再来一局"的回答
    PlayAgain(bool),
    /// 退出
    RequestExit,
}

/// 解析终端输入的一行
///
/// 支持 `name [昵称]`、`<行> <列>`、`y`/`n`、`quit`；无法识别时返回 `None`。
pub fn parse_intent(line: &str) -> Option<Intent> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["name"] | ["join"] => Some(Intent::SubmitName { nickname: None }),
        ["name", nickname] | ["join", nickname] => Some(Intent::SubmitName {
            nickname: Some((*nickname).to_string()),
        }),
        [row, col] => {
            let row = row.parse().ok()?;
            let col = col.parse().ok()?;
            Cell::new(row, col).map(Intent::CellClick)
        }
        [answer] => match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Intent::PlayAgain(true)),
            "n" | "no" => Some(Intent::PlayAgain(false)),
            "q" | "quit" | "exit" => Some(Intent::RequestExit),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intent() {
        assert_eq!(
            parse_intent("name"),
            Some(Intent::SubmitName { nickname: None })
        );
        assert_eq!(
            parse_intent("  name  alice "),
            Some(Intent::SubmitName {
                nickname: Some("alice".to_string())
            })
        );
        assert_eq!(
            parse_intent("1 2"),
            Some(Intent::CellClick(Cell::new_unchecked(1, 2)))
        );
        assert_eq!(parse_intent("Y"), Some(Intent::PlayAgain(true)));
        assert_eq!(parse_intent("no"), Some(Intent::PlayAgain(false)));
        assert_eq!(parse_intent("quit"), Some(Intent::RequestExit));
    }

    #[test]
    fn test_parse_intent_rejects_noise() {
        assert_eq!(parse_intent(""), None);
        assert_eq!(parse_intent("3 0"), None);
        assert_eq!(parse_intent("-1 0"), None);
        assert_eq!(parse_intent("a b"), None);
        assert_eq!(parse_intent("1 1 1"), None);
        assert_eq!(parse_intent("maybe"), None);
    }
}
