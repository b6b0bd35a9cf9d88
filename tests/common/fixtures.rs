use indoc::indoc;

/// Plain table DDL exported from SQL Server
pub const CREATE_USERS: &str = indoc! {r#"
    CREATE TABLE [dbo].[Users] (
        [Id] INT NOT NULL,
        [Name] NVARCHAR(50) NULL
    )
    GO
"#};

pub const CREATE_ORDERS: &str = indoc! {r#"
    CREATE TABLE [dbo].[Orders] (
        [OrderId] INT IDENTITY(1,1) NOT NULL,
        [Note] NVARCHAR(MAX) COLLATE SQL_Latin1_General_CP1_CI_AS NULL,
        [Created] DATETIME NOT NULL DEFAULT GETDATE()
    )
    GO
"#};

/// Always-true flag gating pure DDL
pub const DROP_ALL: &str = "declare @X boolean = 1; if @X = 1 begin drop table T; end";

/// Existence check around business logic
pub const GUARDED_DELETE: &str = indoc! {r#"
    IF EXISTS (SELECT 1 FROM sys.foo) BEGIN
        DELETE FROM dbo.Orders;
    END
"#};

pub const BRACKETS: &str = "SELECT [My Column] FROM [Some Table];";
