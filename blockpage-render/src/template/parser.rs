use crate::error::RenderResult;
use crate::template::lexer::{classify, tokenize, Directive, Position, Token};
use crate::template::node::Node;

/// Maximum depth of nested `{{#if}}` / `{{#each}}` sections.
pub const MAX_NESTING_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    If,
    Else,
    Each,
}

/// What stopped a run of nodes.
#[derive(Debug, Clone, Copy)]
enum End {
    Eof,
    Else(Position),
    CloseIf(Position),
    CloseEach(Position),
}

struct Parser<'a> {
    tokens: std::vec::IntoIter<Token<'a>>,
    depth: usize,
}

/// Parse template text into a node tree.
pub fn parse(src: &str) -> RenderResult<Vec<Node>> {
    let mut parser = Parser {
        tokens: tokenize(src)?.into_iter(),
        depth: 0,
    };

    let (nodes, end) = parser.parse_nodes()?;
    match end {
        End::Eof => Ok(nodes),
        End::Else(pos) => Err(pos.error("{{else}} outside of {{#if}}")),
        End::CloseIf(pos) => Err(pos.error("{{/if}} without matching {{#if}}")),
        End::CloseEach(pos) => Err(pos.error("{{/each}} without matching {{#each}}")),
    }
}

impl<'a> Parser<'a> {
    /// Collect nodes until a section boundary or the end of input.
    fn parse_nodes(&mut self) -> RenderResult<(Vec<Node>, End)> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.next() {
            let (body, pos) = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text.to_string()));
                    continue;
                }
                Token::Tag { body, pos } => (body, pos),
            };

            match classify(body).map_err(|message| pos.error(message))? {
                Directive::Variable(path) => nodes.push(Node::Variable(path)),
                Directive::OpenIf(path) => {
                    self.enter(pos)?;
                    let (then_branch, end) = self.parse_section(Section::If, pos)?;
                    let else_branch = match end {
                        End::Else(_) => {
                            let (branch, _) = self.parse_section(Section::Else, pos)?;
                            branch
                        }
                        _ => Vec::new(),
                    };
                    self.depth -= 1;
                    nodes.push(Node::Conditional {
                        path,
                        then_branch,
                        else_branch,
                    });
                }
                Directive::OpenEach(path) => {
                    self.enter(pos)?;
                    let (body, _) = self.parse_section(Section::Each, pos)?;
                    self.depth -= 1;
                    nodes.push(Node::Iteration { path, body });
                }
                Directive::Else => return Ok((nodes, End::Else(pos))),
                Directive::CloseIf => return Ok((nodes, End::CloseIf(pos))),
                Directive::CloseEach => return Ok((nodes, End::CloseEach(pos))),
            }
        }

        Ok((nodes, End::Eof))
    }

    /// Parse the body of a section opened at `open` and check how it was closed.
    fn parse_section(
        &mut self,
        section: Section,
        open: Position,
    ) -> RenderResult<(Vec<Node>, End)> {
        let (nodes, end) = self.parse_nodes()?;
        match (section, end) {
            (Section::If, End::Else(_) | End::CloseIf(_))
            | (Section::Else, End::CloseIf(_))
            | (Section::Each, End::CloseEach(_)) => Ok((nodes, end)),
            (Section::If | Section::Else, End::Eof) => {
                Err(open.error("unclosed {{#if}}: expected {{/if}}"))
            }
            (Section::Each, End::Eof) => Err(open.error("unclosed {{#each}}: expected {{/each}}")),
            (Section::Else, End::Else(pos)) => Err(pos.error("duplicate {{else}} in {{#if}}")),
            (Section::Each, End::Else(pos)) => {
                Err(pos.error("{{else}} is only valid inside {{#if}}"))
            }
            (Section::If | Section::Else, End::CloseEach(pos)) => {
                Err(pos.error("{{/each}} does not close {{#if}}"))
            }
            (Section::Each, End::CloseIf(pos)) => {
                Err(pos.error("{{/if}} does not close {{#each}}"))
            }
        }
    }

    fn enter(&mut self, pos: Position) -> RenderResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(pos.error(format!(
                "sections nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        self.depth += 1;
        Ok(())
    }
}
